//! Client-layer error taxonomy.

use thiserror::Error;

use crate::adapters::AdapterError;
use crate::store::NoteStatus;
use zkps_note::Commitment;
use zkps_stream::StreamError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Core state-machine or witness-assembly failure.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// External collaborator failure.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// The store reported a status change outside the legal-transition set.
    /// Fatal: the stream must be abandoned, not retried.
    #[error("store reported an illegal status transition for {commitment}: {from} -> {to}")]
    SyncInconsistency {
        commitment: Commitment,
        from: NoteStatus,
        to: NoteStatus,
    },

    /// The confirmation poll budget ran out; the submitted transition is
    /// kept and can be resolved with `resolve_pending`.
    #[error("transition not confirmed after {attempts} sync attempts")]
    ConfirmationTimeout { attempts: u32 },

    /// A new operation was started while a submitted transition is still
    /// awaiting confirmation.
    #[error("an earlier submitted transition is still awaiting confirmation")]
    TransitionInFlight,

    /// Every operation after a fatal `SyncInconsistency` fails with this.
    #[error("stream abandoned after a fatal sync inconsistency")]
    Abandoned,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Fatal faults poison the client; nothing else does.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::SyncInconsistency { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
