//! Note commitments: the public, deterministic handle of a shielded note.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{parse_hex32, HexParseError};

/// Deterministic BLAKE3 hash identifying a note on the ledger.
///
/// Computed over every committed note field (randomness included), so equal
/// commitments imply equal notes and distinct randomness guarantees distinct
/// handles for otherwise identical balances.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Commitment(#[serde(with = "crate::serde_hex")] pub [u8; 32]);

impl Commitment {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, HexParseError> {
        parse_hex32(s).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Truncated hex form for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", hex::encode(self.0))
    }
}
