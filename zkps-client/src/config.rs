//! Client configuration.
//!
//! Deserializable from JSON with per-field defaults, or assembled from
//! `ZKPS_*` environment variables for deployments that configure through the
//! process environment.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::ClientError;
use zkps_note::{AssetId, OwnerId, PredicateId};
use zkps_stream::STREAM_PREDICATE_V1;

pub const OWNER_ENV: &str = "ZKPS_OWNER_ID";
pub const ASSET_ENV: &str = "ZKPS_ASSET_ID";
pub const PREDICATE_ENV: &str = "ZKPS_PREDICATE_ID";
pub const CONFIRM_ATTEMPTS_ENV: &str = "ZKPS_CONFIRM_ATTEMPTS";
pub const CONFIRM_INTERVAL_MS_ENV: &str = "ZKPS_CONFIRM_INTERVAL_MS";

/// Configuration for one stream client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Account that owns the stream's custody notes.
    pub owner: OwnerId,
    /// Asset being streamed.
    #[serde(default = "default_asset")]
    pub asset: AssetId,
    /// Unlock predicate governing the stream notes.
    #[serde(default = "default_predicate")]
    pub predicate: PredicateId,
    /// Confirmation polling behavior.
    #[serde(default)]
    pub confirmation: ConfirmationPolicy,
}

impl ClientConfig {
    /// Defaults for everything but the owner: native asset, v1 stream
    /// predicate, standard confirmation polling.
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            asset: default_asset(),
            predicate: default_predicate(),
            confirmation: ConfirmationPolicy::default(),
        }
    }

    /// Read configuration from `ZKPS_*` environment variables. The owner is
    /// required; everything else falls back to the defaults.
    pub fn from_env() -> Result<Self, ClientError> {
        let owner = env::var(OWNER_ENV)
            .map_err(|_| ClientError::Config(format!("{} is not set", OWNER_ENV)))?;
        let owner = OwnerId::from_hex(&owner)
            .map_err(|e| ClientError::Config(format!("{}: {}", OWNER_ENV, e)))?;
        let mut config = Self::new(owner);

        if let Ok(asset) = env::var(ASSET_ENV) {
            config.asset = AssetId::from_hex(&asset)
                .map_err(|e| ClientError::Config(format!("{}: {}", ASSET_ENV, e)))?;
        }
        if let Ok(predicate) = env::var(PREDICATE_ENV) {
            config.predicate = PredicateId::from_hex(&predicate)
                .map_err(|e| ClientError::Config(format!("{}: {}", PREDICATE_ENV, e)))?;
        }
        if let Ok(attempts) = env::var(CONFIRM_ATTEMPTS_ENV) {
            config.confirmation.max_attempts = attempts
                .parse()
                .map_err(|e| ClientError::Config(format!("{}: {}", CONFIRM_ATTEMPTS_ENV, e)))?;
        }
        if let Ok(interval) = env::var(CONFIRM_INTERVAL_MS_ENV) {
            config.confirmation.poll_interval_ms = interval
                .parse()
                .map_err(|e| ClientError::Config(format!("{}: {}", CONFIRM_INTERVAL_MS_ENV, e)))?;
        }
        Ok(config)
    }
}

/// How long and how often to poll the store after a submit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfirmationPolicy {
    /// Sync attempts before giving up with `ConfirmationTimeout`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pause between attempts, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl ConfirmationPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_asset() -> AssetId {
    AssetId::native()
}

fn default_predicate() -> PredicateId {
    *STREAM_PREDICATE_V1
}

fn default_max_attempts() -> u32 {
    30
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_gets_defaults() {
        let owner = OwnerId::derive(b"payer");
        let json = format!("{{\"owner\":\"{}\"}}", owner);
        let config: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.owner, owner);
        assert_eq!(config.asset, AssetId::native());
        assert_eq!(config.predicate, *STREAM_PREDICATE_V1);
        assert_eq!(config.confirmation.max_attempts, 30);
        assert_eq!(config.confirmation.poll_interval_ms, 2_000);
    }

    #[test]
    fn config_round_trips() {
        let config = ClientConfig::new(OwnerId::derive(b"payer"));
        let json = serde_json::to_string(&config).unwrap();
        let back: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.owner, config.owner);
        assert_eq!(back.predicate, config.predicate);
    }
}
