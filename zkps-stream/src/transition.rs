//! Structured transition requests produced by the stream controller.
//!
//! A [`TransitionRequest`] is the complete description of one ledger
//! transition before proving and submission: the consumed head note, the
//! produced note (if any), and the schedule values the proof witness needs.
//! Building a request has no side effects; it can be discarded freely until
//! it is submitted.

use serde::{Deserialize, Serialize};
use zkps_note::{Commitment, Note, OwnerId};

/// What the caller wants a collection to do once the stream has matured.
/// Consumed at collect time to pick the terminal shape; a pre-maturity
/// collection continues the stream regardless.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectAction {
    /// Close the stream; the full balance leaves note custody at the ledger
    /// level.
    Close,
    /// Close the stream into a fresh plain note for `recipient`, minus the
    /// protocol fee.
    Transfer { recipient: OwnerId },
}

/// Shape of the transition: continue the stream or end it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    /// The stream continues; the produced note is the next head.
    Partial { next_head: Note },
    /// The stream ends; an optional payout note leaves its custody.
    Terminal { payout: Option<Note> },
}

/// One fully-described stream transition, ready for witness assembly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    input: Note,
    kind: TransitionKind,
    current_slot: u64,
    effective_slot: u64,
    diff: u64,
    remaining_amount: u64,
}

impl TransitionRequest {
    pub(crate) fn new(
        input: Note,
        kind: TransitionKind,
        current_slot: u64,
        effective_slot: u64,
        diff: u64,
        remaining_amount: u64,
    ) -> Self {
        Self {
            input,
            kind,
            current_slot,
            effective_slot,
            diff,
            remaining_amount,
        }
    }

    /// The head note this transition consumes.
    pub fn input(&self) -> &Note {
        &self.input
    }

    pub fn kind(&self) -> &TransitionKind {
        &self.kind
    }

    /// Slot the transition was built against (public input).
    pub fn current_slot(&self) -> u64 {
        self.current_slot
    }

    /// Slot the unlock formula was evaluated at; clamped to the end slot
    /// once the stream has matured (private input).
    pub fn effective_slot(&self) -> u64 {
        self.effective_slot
    }

    /// Slots elapsed past maturity; 0 for partial collections.
    pub fn diff(&self) -> u64 {
        self.diff
    }

    /// Balance carried into the continuation note; 0 at the terminal step.
    pub fn remaining_amount(&self) -> u64 {
        self.remaining_amount
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, TransitionKind::Terminal { .. })
    }

    /// The produced note, if the transition creates one.
    pub fn output(&self) -> Option<&Note> {
        match &self.kind {
            TransitionKind::Partial { next_head } => Some(next_head),
            TransitionKind::Terminal { payout } => payout.as_ref(),
        }
    }

    /// Owned copies of all produced notes, in output-slot order.
    pub fn outputs(&self) -> Vec<Note> {
        self.output().cloned().into_iter().collect()
    }

    /// Amount leaving the stream's custody when this transition confirms:
    /// the difference to the continuation note for a partial collection, the
    /// whole head balance at the terminal step.
    pub fn collected(&self) -> u64 {
        match &self.kind {
            TransitionKind::Partial { next_head } => {
                self.input.amount().saturating_sub(next_head.amount())
            }
            TransitionKind::Terminal { .. } => self.input.amount(),
        }
    }
}

/// Result of applying a confirmed transition to the controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvanceOutcome {
    /// Head replaced; the stream remains active.
    Continued { new_head: Commitment },
    /// Terminal transition applied; the stream is closed.
    Closed,
}
