//! Store-side views: note statuses, the program balance, and the legality
//! tracker that turns illegal status transitions into fatal faults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::error;

use crate::error::ClientError;
use zkps_note::{AssetId, Commitment, Note, PredicateId};

// ═══════════════════════════════════════════════════════════════════════════════
// NOTE STATUS
// ═══════════════════════════════════════════════════════════════════════════════

/// Confirmation lifecycle of a note as observed by its owner.
///
/// This is the store's per-owner view, not an intrinsic note property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    /// Submitted, not yet confirmed.
    Pending,
    /// Confirmed, unspent, spendable.
    Ready,
    /// Consumed by a confirmed transition.
    Spent,
    /// The store has never seen this commitment.
    Unknown,
}

impl NoteStatus {
    /// Only `ready` notes may be used as transition inputs.
    pub fn is_spendable(self) -> bool {
        matches!(self, NoteStatus::Ready)
    }
}

impl fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NoteStatus::Pending => "pending",
            NoteStatus::Ready => "ready",
            NoteStatus::Spent => "spent",
            NoteStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Whether an observed status change is legal: `pending -> ready` on
/// confirmation, `ready -> spent` on consumption, any status repeating
/// itself, and anything on first observation. Nothing else.
pub fn is_legal_transition(from: NoteStatus, to: NoteStatus) -> bool {
    match (from, to) {
        (a, b) if a == b => true,
        (NoteStatus::Unknown, _) => true,
        (NoteStatus::Pending, NoteStatus::Ready) => true,
        (NoteStatus::Ready, NoteStatus::Spent) => true,
        _ => false,
    }
}

/// A note together with its current status, as returned by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub note: Note,
    pub status: NoteStatus,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROGRAM BALANCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Notes of one asset under one predicate, keyed by commitment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    notes: BTreeMap<Commitment, NoteRecord>,
}

impl TokenBalance {
    pub fn insert(&mut self, record: NoteRecord) {
        self.notes.insert(record.note.commitment(), record);
    }

    pub fn get(&self, commitment: &Commitment) -> Option<&NoteRecord> {
        self.notes.get(commitment)
    }

    pub fn records(&self) -> impl Iterator<Item = &NoteRecord> {
        self.notes.values()
    }

    /// Sum of all `ready` note amounts.
    pub fn ready_total(&self) -> u64 {
        self.notes
            .values()
            .filter(|record| record.status.is_spendable())
            .map(|record| record.note.amount())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// The confirmed note set one owner holds under one predicate, re-derived by
/// the store on every sync. Read-only for the caller; the source of truth
/// for "does a note with commitment C exist and is it ready."
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramUtxoBalance {
    predicate: PredicateId,
    token_balances: BTreeMap<AssetId, TokenBalance>,
}

impl ProgramUtxoBalance {
    pub fn new(predicate: PredicateId) -> Self {
        Self {
            predicate,
            token_balances: BTreeMap::new(),
        }
    }

    pub fn predicate(&self) -> PredicateId {
        self.predicate
    }

    pub fn insert(&mut self, record: NoteRecord) {
        self.token_balances
            .entry(record.note.asset())
            .or_default()
            .insert(record);
    }

    pub fn token(&self, asset: &AssetId) -> Option<&TokenBalance> {
        self.token_balances.get(asset)
    }

    pub fn note(&self, asset: &AssetId, commitment: &Commitment) -> Option<&NoteRecord> {
        self.token(asset).and_then(|token| token.get(commitment))
    }

    /// Sum of `ready` amounts for one asset.
    pub fn ready_total(&self, asset: &AssetId) -> u64 {
        self.token(asset).map_or(0, TokenBalance::ready_total)
    }

    /// Every record in the balance, across assets.
    pub fn records(&self) -> impl Iterator<Item = &NoteRecord> {
        self.token_balances.values().flat_map(TokenBalance::records)
    }

    pub fn is_empty(&self) -> bool {
        self.token_balances.values().all(TokenBalance::is_empty)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATUS TRACKER
// ═══════════════════════════════════════════════════════════════════════════════

/// Remembers the last observed status per commitment and validates every new
/// observation against the legal-transition set. A violation means the store
/// and this client disagree about history; it is surfaced as the fatal
/// `SyncInconsistency` and never corrected silently.
#[derive(Debug, Default)]
pub struct StatusTracker {
    observed: BTreeMap<Commitment, NoteStatus>,
}

impl StatusTracker {
    pub fn observe(
        &mut self,
        commitment: Commitment,
        status: NoteStatus,
    ) -> Result<NoteStatus, ClientError> {
        let previous = self
            .observed
            .get(&commitment)
            .copied()
            .unwrap_or(NoteStatus::Unknown);
        if !is_legal_transition(previous, status) {
            error!(
                commitment = %commitment.short(),
                from = %previous,
                to = %status,
                "store reported an illegal status transition"
            );
            return Err(ClientError::SyncInconsistency {
                commitment,
                from: previous,
                to: status,
            });
        }
        if status != NoteStatus::Unknown {
            self.observed.insert(commitment, status);
        }
        Ok(status)
    }

    /// Last legally observed status, `Unknown` if never seen.
    pub fn last(&self, commitment: &Commitment) -> NoteStatus {
        self.observed
            .get(commitment)
            .copied()
            .unwrap_or(NoteStatus::Unknown)
    }
}
