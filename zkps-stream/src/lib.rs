//! Streaming-note lifecycle core.
//!
//! A payer locks funds into a single stream note whose program data carries a
//! release schedule (`end_slot`, `rate`). A payee collects from it either
//! partially (consuming the head note and producing a continuation note with
//! a time-proportional reduced balance) or terminally at maturity (paying out
//! the head balance minus the protocol fee, or closing outright). This crate
//! owns the schedule math, the controller state machine, and the proof
//! witness assembly; proving, submission, and note storage are external
//! collaborators driven by `zkps-client`.

use once_cell::sync::Lazy;
use zkps_note::PredicateId;

pub mod controller;
pub mod error;
pub mod schedule;
pub mod transition;
pub mod witness;

pub use controller::StreamController;
pub use error::{Result, StreamError};
pub use transition::{AdvanceOutcome, CollectAction, TransitionKind, TransitionRequest};
pub use witness::{
    build_deposit_witness, build_stream_witness, DepositWitness, StreamWitness,
    TransitionWitness, TRANSITION_OUT_SLOTS,
};

/// Fixed protocol fee deducted from a terminal transfer, in base units of
/// the streamed asset.
pub const STREAM_CLOSE_FEE: u64 = 100_000;

/// Registered identifier of the v1 stream unlock predicate.
pub static STREAM_PREDICATE_V1: Lazy<PredicateId> =
    Lazy::new(|| PredicateId::derive(b"zkps_stream_predicate_v1"));
