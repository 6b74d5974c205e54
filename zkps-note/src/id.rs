//! 32-byte identifiers for assets, accounts, and unlock predicates.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure to parse a 32-byte identifier from hex text.
#[derive(Debug, Error)]
pub enum HexParseError {
    #[error("expected 64 hex chars, got {0}")]
    Length(usize),
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

pub(crate) fn parse_hex32(s: &str) -> Result<[u8; 32], HexParseError> {
    let hex_str = s.strip_prefix("0x").unwrap_or(s);
    if hex_str.len() != 64 {
        return Err(HexParseError::Length(hex_str.len()));
    }
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(hex_str, &mut bytes)?;
    Ok(bytes)
}

fn derive_id(domain: &[u8], seed: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain);
    hasher.update(seed);
    *hasher.finalize().as_bytes()
}

/// Identifier of a fungible asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(#[serde(with = "crate::serde_hex")] pub [u8; 32]);

impl AssetId {
    /// The ledger's native asset.
    pub const fn native() -> Self {
        Self([0u8; 32])
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive an asset identifier from arbitrary seed bytes.
    pub fn derive(seed: &[u8]) -> Self {
        Self(derive_id(b"zkps_asset_id_v1", seed))
    }

    pub fn from_hex(s: &str) -> Result<Self, HexParseError> {
        parse_hex32(s).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Public identifier of a controlling account (not its signing key).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId(#[serde(with = "crate::serde_hex")] pub [u8; 32]);

impl OwnerId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive an owner identifier from a seed fingerprint.
    pub fn derive(seed: &[u8]) -> Self {
        Self(derive_id(b"zkps_owner_id_v1", seed))
    }

    pub fn from_hex(s: &str) -> Result<Self, HexParseError> {
        parse_hex32(s).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Identifier of the unlock predicate (proof circuit) governing a note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PredicateId(#[serde(with = "crate::serde_hex")] pub [u8; 32]);

impl PredicateId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a predicate identifier from its registration seed.
    pub fn derive(seed: &[u8]) -> Self {
        Self(derive_id(b"zkps_predicate_id_v1", seed))
    }

    pub fn from_hex(s: &str) -> Result<Self, HexParseError> {
        parse_hex32(s).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PredicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic_and_domain_separated() {
        assert_eq!(OwnerId::derive(b"alice"), OwnerId::derive(b"alice"));
        assert_ne!(OwnerId::derive(b"alice"), OwnerId::derive(b"bob"));
        // Same seed under different domains must not collide.
        assert_ne!(OwnerId::derive(b"alice").0, AssetId::derive(b"alice").0);
    }

    #[test]
    fn hex_round_trip() {
        let id = PredicateId::derive(b"stream");
        let parsed = PredicateId::from_hex(&id.to_string()).unwrap();
        assert_eq!(id, parsed);

        let prefixed = format!("0x{}", id);
        assert_eq!(PredicateId::from_hex(&prefixed).unwrap(), id);
    }

    #[test]
    fn hex_rejects_wrong_length() {
        assert!(matches!(
            OwnerId::from_hex("abcd"),
            Err(HexParseError::Length(4))
        ));
    }

    #[test]
    fn serde_uses_hex_strings() {
        let id = AssetId::native();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "0".repeat(64)));
        let back: AssetId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
