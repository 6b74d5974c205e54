//! Async client for driving a payment stream against a confidential ledger.
//!
//! The stream crates split the work in two: `zkps-stream` holds the pure
//! state machine (what the next transition must look like), and this crate
//! holds the orchestration (getting that transition proven, submitted, and
//! confirmed before the state machine moves).
//!
//! # Collaborators
//!
//! The client talks to the outside world through three traits:
//! ```text
//! NoteStore           - synced view of confirmed notes and their statuses
//! TransitionExecutor  - submits proven transitions to the ledger
//! ProofBackend        - produces proofs over transition witnesses
//! ```
//! All three are object-safe and consumed as `Arc<dyn Trait>`, so tests can
//! swap in an in-memory ledger and production can plug in real transports.
//!
//! # Confirmation discipline
//!
//! The head of a stream advances only after the store reports the consumed
//! note as `spent` and every produced note as `ready`. A submission that
//! cannot be confirmed in time is kept as pending and resumed with
//! [`StreamClient::resolve_pending`]; it is never forgotten and never
//! re-submitted.

pub mod adapters;
pub mod client;
pub mod config;
pub mod error;
pub mod store;

pub use adapters::{
    AdapterError, NoteStore, ProofBackend, ProofBlob, TransactionId, TransitionExecutor,
};
pub use client::{CollectOutcome, StreamClient};
pub use config::{ClientConfig, ConfirmationPolicy};
pub use error::{ClientError, Result};
pub use store::{NoteRecord, NoteStatus, ProgramUtxoBalance, StatusTracker, TokenBalance};
