//! Proof witness assembly for stream transitions.
//!
//! The unlock predicate's circuit has a static shape: a fixed number of
//! output slots and a fixed input set. This module turns a
//! [`TransitionRequest`] into exactly that shape, failing with
//! `SchemaMismatch` when the consumed note is not governed by the expected
//! predicate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StreamError};
use crate::transition::TransitionRequest;
use zkps_note::{Commitment, Note, PredicateId};

/// Output slots in the transition circuit, used or not.
pub const TRANSITION_OUT_SLOTS: usize = 4;

/// Input set of the stream predicate circuit.
///
/// `current_slot` and `is_out_utxo` are public; the rest are private
/// witnesses the circuit checks against the consumed note's program data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamWitness {
    /// Slot the ledger verifies the transition against (public).
    pub current_slot: u64,
    /// Slot the unlock formula was evaluated at; equals `end_slot` once the
    /// stream has matured, `current_slot` before (private).
    pub effective_slot: u64,
    /// Stream end slot from the consumed note's terms (private).
    pub end_slot: u64,
    /// Release rate from the consumed note's terms (private).
    pub rate: u64,
    /// Slots elapsed past maturity; always 0 for partial collections.
    /// Reserved for decay-style predicate extensions (private).
    pub diff: u64,
    /// Balance carried into the continuation note; 0 at the terminal step
    /// (private).
    pub remaining_amount: u64,
    /// Which of the circuit's static output slots this transition populates
    /// (public).
    pub is_out_utxo: [bool; TRANSITION_OUT_SLOTS],
}

/// Input set of the system deposit circuit: just the created commitments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositWitness {
    pub commitments: Vec<Commitment>,
}

/// Closed set of witness shapes, one variant per circuit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "circuit", rename_all = "snake_case")]
pub enum TransitionWitness {
    /// System circuit creating notes from outside custody.
    Deposit(DepositWitness),
    /// Stream predicate circuit consuming a stream head.
    Stream(StreamWitness),
}

/// Assemble the stream predicate's witness for a collection transition.
///
/// Fails with `SchemaMismatch` if the consumed note is not governed by
/// `predicate` or carries no stream terms.
pub fn build_stream_witness(
    request: &TransitionRequest,
    predicate: PredicateId,
) -> Result<TransitionWitness> {
    let input = request.input();
    match input.predicate() {
        Some(actual) if actual == predicate => {}
        Some(_) => {
            return Err(StreamError::SchemaMismatch {
                predicate,
                detail: "consumed note is governed by a different predicate".into(),
            })
        }
        None => {
            return Err(StreamError::SchemaMismatch {
                predicate,
                detail: "consumed note carries no predicate".into(),
            })
        }
    }
    let terms = input.stream_terms().ok_or_else(|| StreamError::SchemaMismatch {
        predicate,
        detail: "consumed note carries no stream terms".into(),
    })?;

    let outputs = request.outputs();
    if outputs.len() > TRANSITION_OUT_SLOTS {
        return Err(StreamError::SchemaMismatch {
            predicate,
            detail: format!(
                "transition has {} outputs but the circuit has {} slots",
                outputs.len(),
                TRANSITION_OUT_SLOTS
            ),
        });
    }
    let mut is_out_utxo = [false; TRANSITION_OUT_SLOTS];
    for (slot, _) in outputs.iter().enumerate() {
        is_out_utxo[slot] = true;
    }

    let witness = StreamWitness {
        current_slot: request.current_slot(),
        effective_slot: request.effective_slot(),
        end_slot: terms.end_slot,
        rate: terms.rate,
        diff: request.diff(),
        remaining_amount: request.remaining_amount(),
        is_out_utxo,
    };
    debug!(
        input = %input.commitment().short(),
        terminal = request.is_terminal(),
        "assembled stream witness"
    );
    Ok(TransitionWitness::Stream(witness))
}

/// Assemble the system deposit witness for newly created notes.
pub fn build_deposit_witness(outputs: &[Note]) -> TransitionWitness {
    TransitionWitness::Deposit(DepositWitness {
        commitments: outputs.iter().map(Note::commitment).collect(),
    })
}
