//! Contracts for the three external collaborators: the note store, the
//! transition executor, and the proof backend.
//!
//! All three are async, object-safe traits consumed as `Arc<dyn Trait>`.
//! Implementations are expected to be plain request/response adapters: no
//! internal retries, no background work. The client retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::store::{NoteRecord, NoteStatus, ProgramUtxoBalance};
use zkps_note::{Commitment, Note, OwnerId, PredicateId};
use zkps_stream::TransitionWitness;

// ═══════════════════════════════════════════════════════════════════════════════
// WIRE SHAPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque proof bytes produced by the proof backend, verified by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBlob(pub Vec<u8>);

impl ProofBlob {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ledger handle of a submitted transition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADAPTER ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Failures surfaced by the external collaborators.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A transition input was already consumed; the caller's head is stale.
    #[error("note {0} is already spent")]
    NoteAlreadySpent(Commitment),

    /// The store has no record of this commitment.
    #[error("note {0} is not known to the store")]
    NotFound(Commitment),

    #[error("proof generation failed: {0}")]
    ProofGenerationFailed(String),

    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// Transport or backend fault unrelated to the submitted data.
    #[error("store backend error: {0}")]
    Backend(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLABORATOR TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// The persistent encrypted note store and its synchronization routine.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Re-derive the confirmed view of `owner`'s notes under `predicate`.
    /// Callers must re-sync after a submit before trusting any status.
    async fn sync(
        &self,
        owner: OwnerId,
        predicate: PredicateId,
    ) -> Result<ProgramUtxoBalance, AdapterError>;

    /// Note plus status, or `NotFound`.
    async fn get(&self, commitment: Commitment) -> Result<NoteRecord, AdapterError>;

    /// Current status of one commitment; `Unknown` if never seen.
    async fn status_of(&self, commitment: Commitment) -> Result<NoteStatus, AdapterError>;

    /// The ledger's current slot height.
    async fn current_slot(&self) -> Result<u64, AdapterError>;
}

/// The ledger submission channel.
#[async_trait]
pub trait TransitionExecutor: Send + Sync {
    /// Broadcast one transition. Atomic: either every input becomes `spent`
    /// and every output becomes `pending`, or nothing changes. Returns once
    /// broadcast, not once confirmed.
    async fn submit(
        &self,
        inputs: &[Note],
        outputs: &[Note],
        proof: &ProofBlob,
    ) -> Result<TransactionId, AdapterError>;
}

/// The proof-generation backend.
#[async_trait]
pub trait ProofBackend: Send + Sync {
    /// Prove one transition witness. `predicate` names the unlock predicate
    /// circuit, or `None` for system-circuit transitions (deposits).
    async fn prove(
        &self,
        predicate: Option<PredicateId>,
        witness: &TransitionWitness,
    ) -> Result<ProofBlob, AdapterError>;
}
