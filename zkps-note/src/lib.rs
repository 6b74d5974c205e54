//! Shielded note value objects for confidential payment streaming.
//!
//! A [`Note`] is one confidential balance record on a UTXO-style private
//! ledger: an asset, an amount, an owner, optional program metadata
//! interpreted by an unlock predicate, and blinding randomness. Its public
//! handle is a deterministic BLAKE3 [`Commitment`] over all of those fields.
//!
//! Notes are immutable once constructed. Everything that changes a balance
//! happens by consuming one note and producing another.

pub mod commitment;
pub mod id;
pub mod note;

pub use commitment::Commitment;
pub use id::{AssetId, HexParseError, OwnerId, PredicateId};
pub use note::{Note, NoteRandomness, ProgramData, StreamTerms};

/// Serializes 32-byte values as lowercase hex strings (`0x`-prefix accepted
/// on input). Shared by the identifier and commitment newtypes.
pub(crate) mod serde_hex {
    use serde::{de, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        struct HexVisitor;

        impl de::Visitor<'_> for HexVisitor {
            type Value = [u8; 32];

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a 32-byte hex string (with or without 0x prefix)")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let hex_str = v.strip_prefix("0x").unwrap_or(v);
                if hex_str.len() != 64 {
                    return Err(E::custom(format!(
                        "expected 64 hex chars, got {}",
                        hex_str.len()
                    )));
                }
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(hex_str, &mut bytes).map_err(E::custom)?;
                Ok(bytes)
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}
