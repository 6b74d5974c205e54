//! Error taxonomy for the streaming-note core.

use thiserror::Error;
use zkps_note::{Commitment, PredicateId};

#[derive(Debug, Error)]
pub enum StreamError {
    /// `setup` called on a controller that already carries a stream.
    #[error("stream is already initialized")]
    AlreadyInitialized,

    /// `collect`, `advance`, or `head_commitment` called while no stream is
    /// active (never set up, or already closed).
    #[error("no active stream")]
    NotInitialized,

    /// Zero-slot duration, or an end slot past the slot horizon.
    #[error("invalid stream duration: {0} slots")]
    InvalidDuration(u64),

    /// Terminal transfer where the head cannot cover the protocol fee.
    #[error("head note holds {available} but the terminal transfer requires at least {required}")]
    InsufficientFunds { available: u64, required: u64 },

    /// A confirmed transition was applied against a head it did not consume.
    #[error("transition consumes {found} but the current head is {expected}")]
    StaleTransition {
        expected: Commitment,
        found: Commitment,
    },

    /// The assembled witness does not match the predicate's expected input
    /// shape.
    #[error("predicate {predicate} cannot consume the assembled witness: {detail}")]
    SchemaMismatch {
        predicate: PredicateId,
        detail: String,
    },
}

pub type Result<T> = std::result::Result<T, StreamError>;
