//! In-memory ledger used across the client tests.
//!
//! One mutex-guarded map of commitment to note/status stands in for the
//! whole chain: `submit` flips inputs to `spent` and records outputs as
//! `pending`, and confirmation is modeled two ways. With auto-confirm (the
//! default) every `sync` promotes `pending` notes to `ready`, mimicking a
//! ledger that finalizes between polls. After
//! [`manual_confirmation`](MockLedger::manual_confirmation) nothing becomes
//! `ready` until the test calls [`confirm_all`](MockLedger::confirm_all),
//! which is how the timeout and resume paths are exercised.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use zkps_client::{
    AdapterError, NoteRecord, NoteStatus, NoteStore, ProgramUtxoBalance, ProofBackend, ProofBlob,
    TransactionId, TransitionExecutor,
};
use zkps_note::{Commitment, Note, OwnerId, PredicateId};
use zkps_stream::TransitionWitness;

const PROOF_DOMAIN: &[u8] = b"zkps_mock_proof_v1";
const TXID_DOMAIN: &[u8] = b"zkps_mock_txid_v1";

#[derive(Clone, Debug)]
struct LedgerEntry {
    note: Note,
    status: NoteStatus,
}

#[derive(Debug)]
struct LedgerInner {
    slot: u64,
    auto_confirm: bool,
    entries: BTreeMap<Commitment, LedgerEntry>,
    submissions: u64,
}

/// In-memory single-process ledger implementing the store, executor, and
/// prover contracts.
pub struct MockLedger {
    inner: Mutex<LedgerInner>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::at_slot(0)
    }

    /// A ledger whose clock starts at `slot`.
    pub fn at_slot(slot: u64) -> Self {
        Self {
            inner: Mutex::new(LedgerInner {
                slot,
                auto_confirm: true,
                entries: BTreeMap::new(),
                submissions: 0,
            }),
        }
    }

    /// Stop promoting `pending` notes on sync; from here on only
    /// [`confirm_all`](Self::confirm_all) confirms.
    pub async fn manual_confirmation(&self) {
        self.inner.lock().await.auto_confirm = false;
    }

    pub async fn advance_slots(&self, slots: u64) {
        self.inner.lock().await.slot += slots;
    }

    pub async fn slot(&self) -> u64 {
        self.inner.lock().await.slot
    }

    /// Promote every `pending` note to `ready`.
    pub async fn confirm_all(&self) {
        let mut inner = self.inner.lock().await;
        for entry in inner.entries.values_mut() {
            if entry.status == NoteStatus::Pending {
                entry.status = NoteStatus::Ready;
            }
        }
    }

    /// Corruption hook: force a status the protocol would never produce.
    /// Has no effect on commitments the ledger has never seen.
    pub async fn override_status(&self, commitment: Commitment, status: NoteStatus) {
        if let Some(entry) = self.inner.lock().await.entries.get_mut(&commitment) {
            entry.status = status;
        }
    }

    /// Number of transitions accepted so far, deposits included.
    pub async fn submissions(&self) -> u64 {
        self.inner.lock().await.submissions
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteStore for MockLedger {
    async fn sync(
        &self,
        owner: OwnerId,
        predicate: PredicateId,
    ) -> Result<ProgramUtxoBalance, AdapterError> {
        let mut inner = self.inner.lock().await;
        if inner.auto_confirm {
            for entry in inner.entries.values_mut() {
                if entry.status == NoteStatus::Pending {
                    entry.status = NoteStatus::Ready;
                }
            }
        }
        let mut balance = ProgramUtxoBalance::new(predicate);
        for entry in inner.entries.values() {
            if entry.note.owner() != owner || entry.note.predicate() != Some(predicate) {
                continue;
            }
            balance.insert(NoteRecord {
                note: entry.note.clone(),
                status: entry.status,
            });
        }
        debug!(notes = balance.records().count(), "mock ledger synced");
        Ok(balance)
    }

    async fn get(&self, commitment: Commitment) -> Result<NoteRecord, AdapterError> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(&commitment)
            .map(|entry| NoteRecord {
                note: entry.note.clone(),
                status: entry.status,
            })
            .ok_or(AdapterError::NotFound(commitment))
    }

    async fn status_of(&self, commitment: Commitment) -> Result<NoteStatus, AdapterError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .entries
            .get(&commitment)
            .map(|entry| entry.status)
            .unwrap_or(NoteStatus::Unknown))
    }

    async fn current_slot(&self) -> Result<u64, AdapterError> {
        Ok(self.inner.lock().await.slot)
    }
}

#[async_trait]
impl TransitionExecutor for MockLedger {
    async fn submit(
        &self,
        inputs: &[Note],
        outputs: &[Note],
        proof: &ProofBlob,
    ) -> Result<TransactionId, AdapterError> {
        if proof.is_empty() {
            return Err(AdapterError::SubmissionRejected("empty proof".into()));
        }
        let mut inner = self.inner.lock().await;

        // Validate everything before touching any entry; the transition
        // applies atomically or not at all.
        for note in inputs {
            let commitment = note.commitment();
            match inner.entries.get(&commitment) {
                None => {
                    return Err(AdapterError::SubmissionRejected(format!(
                        "input note {} not found",
                        commitment.short()
                    )))
                }
                Some(entry) if entry.status == NoteStatus::Spent => {
                    return Err(AdapterError::NoteAlreadySpent(commitment))
                }
                Some(entry) if entry.status != NoteStatus::Ready => {
                    return Err(AdapterError::SubmissionRejected(format!(
                        "input note {} not confirmed",
                        commitment.short()
                    )))
                }
                Some(_) => {}
            }
        }
        for note in outputs {
            if inner.entries.contains_key(&note.commitment()) {
                return Err(AdapterError::SubmissionRejected(format!(
                    "output commitment {} already exists",
                    note.commitment().short()
                )));
            }
        }

        for note in inputs {
            if let Some(entry) = inner.entries.get_mut(&note.commitment()) {
                entry.status = NoteStatus::Spent;
            }
        }
        for note in outputs {
            inner.entries.insert(
                note.commitment(),
                LedgerEntry {
                    note: note.clone(),
                    status: NoteStatus::Pending,
                },
            );
        }
        inner.submissions += 1;

        let mut hasher = blake3::Hasher::new();
        hasher.update(TXID_DOMAIN);
        hasher.update(&inner.submissions.to_le_bytes());
        let digest = hasher.finalize();
        let transaction = TransactionId(format!("0x{}", hex::encode(&digest.as_bytes()[..16])));
        debug!(
            %transaction,
            inputs = inputs.len(),
            outputs = outputs.len(),
            "mock ledger accepted transition"
        );
        Ok(transaction)
    }
}

#[async_trait]
impl ProofBackend for MockLedger {
    async fn prove(
        &self,
        predicate: Option<PredicateId>,
        witness: &TransitionWitness,
    ) -> Result<ProofBlob, AdapterError> {
        let encoded = serde_json::to_vec(witness)
            .map_err(|err| AdapterError::ProofGenerationFailed(err.to_string()))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(PROOF_DOMAIN);
        if let Some(predicate) = predicate {
            hasher.update(predicate.as_bytes());
        }
        hasher.update(&encoded);
        Ok(ProofBlob(hasher.finalize().as_bytes().to_vec()))
    }
}

/// A prover that fails every request; drives the pre-submission error path.
pub struct RejectingProver;

#[async_trait]
impl ProofBackend for RejectingProver {
    async fn prove(
        &self,
        _predicate: Option<PredicateId>,
        _witness: &TransitionWitness,
    ) -> Result<ProofBlob, AdapterError> {
        Err(AdapterError::ProofGenerationFailed("prover offline".into()))
    }
}
