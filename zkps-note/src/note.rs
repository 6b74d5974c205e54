//! The shielded note value object and its program metadata.

use once_cell::sync::OnceCell;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::id::{AssetId, OwnerId, PredicateId};

const COMMITMENT_DOMAIN: &[u8] = b"zkps_note_commitment_v1";

/// Release schedule carried by a stream note: funds unlock at `rate` units
/// per slot until `end_slot`, at which point the full balance is mature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamTerms {
    /// Slot at which the stream matures.
    pub end_slot: u64,
    /// Units released per slot.
    pub rate: u64,
}

/// Program metadata interpreted by a note's unlock predicate.
///
/// One variant per predicate type, so schedule math and witness assembly can
/// match exhaustively instead of probing loose fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgramData {
    /// No program semantics; an ordinary balance note.
    Plain,
    /// A payment stream releasing funds on a per-slot schedule.
    Stream(StreamTerms),
}

impl ProgramData {
    pub fn stream_terms(&self) -> Option<&StreamTerms> {
        match self {
            ProgramData::Plain => None,
            ProgramData::Stream(terms) => Some(terms),
        }
    }
}

/// Blinding randomness committed alongside a note's visible fields.
///
/// Two notes that agree on every visible field still receive distinct
/// commitments when their randomness differs; re-noting an unchanged balance
/// therefore always yields a fresh ledger handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRandomness(#[serde(with = "crate::serde_hex")] pub [u8; 32]);

impl NoteRandomness {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Fresh randomness from the OS entropy source.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// One confidential balance record.
///
/// Immutable after construction: fields are private, accessors are read-only,
/// and the commitment is computed lazily from the committed fields and cached.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Note {
    asset: AssetId,
    amount: u64,
    owner: OwnerId,
    program: ProgramData,
    predicate: Option<PredicateId>,
    randomness: NoteRandomness,
    #[serde(skip)]
    commitment: OnceCell<Commitment>,
}

impl Note {
    /// A plain balance note with no program semantics and no predicate.
    pub fn plain(
        asset: AssetId,
        amount: u64,
        owner: OwnerId,
        randomness: NoteRandomness,
    ) -> Self {
        Self {
            asset,
            amount,
            owner,
            program: ProgramData::Plain,
            predicate: None,
            randomness,
            commitment: OnceCell::new(),
        }
    }

    /// A stream note governed by `predicate` and carrying `terms`.
    pub fn stream(
        asset: AssetId,
        amount: u64,
        owner: OwnerId,
        terms: StreamTerms,
        predicate: PredicateId,
        randomness: NoteRandomness,
    ) -> Self {
        Self {
            asset,
            amount,
            owner,
            program: ProgramData::Stream(terms),
            predicate: Some(predicate),
            randomness,
            commitment: OnceCell::new(),
        }
    }

    pub fn asset(&self) -> AssetId {
        self.asset
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn program(&self) -> &ProgramData {
        &self.program
    }

    pub fn predicate(&self) -> Option<PredicateId> {
        self.predicate
    }

    pub fn randomness(&self) -> &NoteRandomness {
        &self.randomness
    }

    /// Stream terms, if this is a stream note.
    pub fn stream_terms(&self) -> Option<&StreamTerms> {
        self.program.stream_terms()
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.program, ProgramData::Stream(_))
    }

    /// The note's deterministic commitment. Computed on first use, cached
    /// afterwards; construction-time immutability keeps the cache valid for
    /// the note's lifetime.
    pub fn commitment(&self) -> Commitment {
        *self.commitment.get_or_init(|| self.compute_commitment())
    }

    fn compute_commitment(&self) -> Commitment {
        let mut hasher = blake3::Hasher::new();
        hasher.update(COMMITMENT_DOMAIN);
        hasher.update(self.asset.as_bytes());
        hasher.update(&self.amount.to_le_bytes());
        hasher.update(self.owner.as_bytes());
        // Fixed-width framing with a tag byte per optional field keeps the
        // encoding injective.
        match &self.program {
            ProgramData::Plain => {
                hasher.update(&[0u8]);
            }
            ProgramData::Stream(terms) => {
                hasher.update(&[1u8]);
                hasher.update(&terms.end_slot.to_le_bytes());
                hasher.update(&terms.rate.to_le_bytes());
            }
        }
        match &self.predicate {
            None => {
                hasher.update(&[0u8]);
            }
            Some(predicate) => {
                hasher.update(&[1u8]);
                hasher.update(predicate.as_bytes());
            }
        }
        hasher.update(self.randomness.as_bytes());
        Commitment(*hasher.finalize().as_bytes())
    }
}

// The cached commitment is derived state and excluded from equality.
impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.asset == other.asset
            && self.amount == other.amount
            && self.owner == other.owner
            && self.program == other.program
            && self.predicate == other.predicate
            && self.randomness == other.randomness
    }
}

impl Eq for Note {}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_note(amount: u64, randomness: [u8; 32]) -> Note {
        Note::stream(
            AssetId::native(),
            amount,
            OwnerId::derive(b"payer"),
            StreamTerms {
                end_slot: 101,
                rate: 1_000_000_000,
            },
            PredicateId::derive(b"stream"),
            NoteRandomness::from_bytes(randomness),
        )
    }

    #[test]
    fn identical_fields_identical_commitments() {
        let a = stream_note(1_000_000_000, [42u8; 32]);
        let b = stream_note(1_000_000_000, [42u8; 32]);
        assert_eq!(a, b);
        assert_eq!(a.commitment(), b.commitment());
    }

    #[test]
    fn different_amounts_different_commitments() {
        let a = stream_note(100_000, [42u8; 32]);
        let b = stream_note(200_000, [42u8; 32]);
        assert_ne!(a.commitment(), b.commitment());
    }

    #[test]
    fn different_randomness_different_commitments() {
        // Re-noting an unchanged balance must produce a fresh handle.
        let a = stream_note(900, [1u8; 32]);
        let b = stream_note(900, [2u8; 32]);
        assert_eq!(a.amount(), b.amount());
        assert_ne!(a.commitment(), b.commitment());
    }

    #[test]
    fn program_variant_is_committed() {
        let owner = OwnerId::derive(b"payer");
        let randomness = NoteRandomness::from_bytes([9u8; 32]);
        let plain = Note::plain(AssetId::native(), 900, owner, randomness);
        let stream = stream_note(900, [9u8; 32]);
        assert_ne!(plain.commitment(), stream.commitment());
    }

    #[test]
    fn commitment_survives_serde() {
        let note = stream_note(900, [7u8; 32]);
        let json = serde_json::to_string(&note).unwrap();
        let back: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note);
        assert_eq!(back.commitment(), note.commitment());
    }

    #[test]
    fn plain_note_has_no_predicate() {
        let note = Note::plain(
            AssetId::native(),
            5,
            OwnerId::derive(b"payee"),
            NoteRandomness::from_bytes([0u8; 32]),
        );
        assert!(note.predicate().is_none());
        assert!(!note.is_stream());
        assert!(note.stream_terms().is_none());
    }
}
