//! Shared fixtures for exercising the stream client without a real ledger.
//!
//! The centerpiece is [`MockLedger`]: a single in-memory object implementing
//! all three collaborator traits, so one `Arc` can serve as store, executor,
//! and prover for a [`zkps_client::StreamClient`]. Its confirmation model is
//! configurable per test; see the module docs in [`ledger`].

use std::sync::Arc;

use zkps_client::{ClientConfig, ConfirmationPolicy, StreamClient};
use zkps_note::OwnerId;

pub mod ledger;

pub use ledger::{MockLedger, RejectingProver};

/// Deterministic owner derived from a test name.
pub fn test_owner(name: &str) -> OwnerId {
    OwnerId::derive(name.as_bytes())
}

/// Client configuration tuned for fast test polling.
pub fn test_config(owner: OwnerId) -> ClientConfig {
    let mut config = ClientConfig::new(owner);
    config.confirmation = ConfirmationPolicy {
        max_attempts: 5,
        poll_interval_ms: 1,
    };
    config
}

/// A stream client wired entirely to `ledger`, for the given owner.
pub fn client_for(ledger: Arc<MockLedger>, owner: OwnerId) -> StreamClient {
    StreamClient::new(test_config(owner), ledger.clone(), ledger.clone(), ledger)
}

/// A stream client over `ledger` with a fixed fixture owner.
pub fn client_over(ledger: Arc<MockLedger>) -> StreamClient {
    client_for(ledger, test_owner("fixture-owner"))
}
