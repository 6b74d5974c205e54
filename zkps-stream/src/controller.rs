//! The stream controller state machine.
//!
//! One controller instance manages one stream: `Uninitialized` until `setup`
//! creates the origin note, `Active` while the head note can still be
//! collected, `Closed` after the terminal collection confirms. The head note
//! is the controller's only mutable state and is replaced wholesale by
//! [`StreamController::advance`], which callers invoke strictly after the
//! ledger has confirmed the transition. `collect` itself never mutates.

use tracing::{debug, info};

use crate::error::{Result, StreamError};
use crate::schedule::{compute_rate, is_matured, remaining_amount};
use crate::transition::{AdvanceOutcome, CollectAction, TransitionKind, TransitionRequest};
use crate::STREAM_CLOSE_FEE;
use zkps_note::{AssetId, Commitment, Note, NoteRandomness, OwnerId, PredicateId, StreamTerms};

#[derive(Clone, Debug)]
enum Phase {
    Uninitialized,
    Active { origin: Note, head: Note },
    Closed { origin: Note },
}

/// Stateful orchestrator for one payment stream.
///
/// Not designed for concurrent use: one controller per stream, owned by a
/// single logical thread of control.
#[derive(Clone, Debug)]
pub struct StreamController {
    asset: AssetId,
    predicate: PredicateId,
    phase: Phase,
}

impl StreamController {
    /// A controller with no stream yet, for the given asset and predicate.
    pub fn new(asset: AssetId, predicate: PredicateId) -> Self {
        Self {
            asset,
            predicate,
            phase: Phase::Uninitialized,
        }
    }

    /// Rebuild an `Active` controller around an existing stream: the origin
    /// note it was set up with and its latest confirmed head.
    ///
    /// Fails with `SchemaMismatch` if the notes do not describe one stream
    /// (differing asset, predicate, or stream terms, or a non-stream origin).
    pub fn restore(origin: Note, head: Note) -> Result<Self> {
        let predicate = match (origin.predicate(), origin.stream_terms()) {
            (Some(predicate), Some(_)) => predicate,
            (Some(predicate), None) => {
                return Err(StreamError::SchemaMismatch {
                    predicate,
                    detail: "origin note carries no stream terms".into(),
                })
            }
            (None, _) => {
                return Err(StreamError::SchemaMismatch {
                    predicate: PredicateId::from_bytes([0u8; 32]),
                    detail: "origin note is not governed by a predicate".into(),
                })
            }
        };
        let consistent = head.asset() == origin.asset()
            && head.predicate() == Some(predicate)
            && head.stream_terms() == origin.stream_terms();
        if !consistent {
            return Err(StreamError::SchemaMismatch {
                predicate,
                detail: "head note does not continue the origin stream".into(),
            });
        }
        info!(
            origin = %origin.commitment().short(),
            head = %head.commitment().short(),
            "restored active stream"
        );
        Ok(Self {
            asset: origin.asset(),
            predicate,
            phase: Phase::Active { origin, head },
        })
    }

    /// Create the stream: computes `end_slot = current_slot + duration_slots`
    /// and `rate = amount / duration_slots`, builds the origin note carrying
    /// those terms, and activates the controller with origin and head both
    /// set to it. Returns the origin note for the caller to deposit.
    pub fn setup(
        &mut self,
        amount: u64,
        duration_slots: u64,
        current_slot: u64,
        owner: OwnerId,
    ) -> Result<Note> {
        if !matches!(self.phase, Phase::Uninitialized) {
            return Err(StreamError::AlreadyInitialized);
        }
        let rate = compute_rate(amount, duration_slots)?;
        let end_slot = current_slot
            .checked_add(duration_slots)
            .ok_or(StreamError::InvalidDuration(duration_slots))?;
        let terms = StreamTerms { end_slot, rate };
        let origin = Note::stream(
            self.asset,
            amount,
            owner,
            terms,
            self.predicate,
            NoteRandomness::random(),
        );
        info!(
            commitment = %origin.commitment().short(),
            amount,
            end_slot,
            rate,
            "stream initialized"
        );
        self.phase = Phase::Active {
            origin: origin.clone(),
            head: origin.clone(),
        };
        Ok(origin)
    }

    /// Build the next collection transition against the current head.
    ///
    /// Pure: the controller is unchanged until the transition confirms and
    /// [`advance`](Self::advance) is applied. Before maturity this is a
    /// partial collection producing the next head; at or after maturity it
    /// is the terminal collection honoring `action`.
    pub fn collect(&self, current_slot: u64, action: CollectAction) -> Result<TransitionRequest> {
        let (origin, head) = match &self.phase {
            Phase::Active { origin, head } => (origin, head),
            _ => return Err(StreamError::NotInitialized),
        };
        let terms = *origin.stream_terms().ok_or_else(|| StreamError::SchemaMismatch {
            predicate: self.predicate,
            detail: "origin note carries no stream terms".into(),
        })?;

        let request = if is_matured(&terms, current_slot) {
            // Terminal collection. `diff` is carried for audit-style
            // predicate extensions and never enters the payout math.
            let diff = current_slot - terms.end_slot;
            let payout = match &action {
                CollectAction::Transfer { recipient } => {
                    let amount = head.amount().checked_sub(STREAM_CLOSE_FEE).ok_or(
                        StreamError::InsufficientFunds {
                            available: head.amount(),
                            required: STREAM_CLOSE_FEE,
                        },
                    )?;
                    Some(Note::plain(
                        self.asset,
                        amount,
                        *recipient,
                        NoteRandomness::random(),
                    ))
                }
                CollectAction::Close => None,
            };
            debug!(
                head = %head.commitment().short(),
                diff,
                transfer = payout.is_some(),
                "built terminal collection"
            );
            TransitionRequest::new(
                head.clone(),
                TransitionKind::Terminal { payout },
                current_slot,
                terms.end_slot,
                diff,
                0,
            )
        } else {
            // Partial collection: the continuation note keeps the origin's
            // terms so the stream can keep going.
            let remaining = remaining_amount(&terms, head.amount(), current_slot);
            let next_head = Note::stream(
                self.asset,
                remaining,
                origin.owner(),
                terms,
                self.predicate,
                NoteRandomness::random(),
            );
            debug!(
                head = %head.commitment().short(),
                remaining,
                collected = head.amount() - remaining,
                "built partial collection"
            );
            TransitionRequest::new(
                head.clone(),
                TransitionKind::Partial { next_head },
                current_slot,
                current_slot,
                0,
                remaining,
            )
        };
        Ok(request)
    }

    /// Apply a transition the ledger has confirmed.
    ///
    /// Must be called strictly after the note store reports the transition's
    /// input spent and its outputs confirmed, never optimistically. Fails
    /// with `StaleTransition` if the request does not consume the current
    /// head.
    pub fn advance(&mut self, request: &TransitionRequest) -> Result<AdvanceOutcome> {
        let (origin, head) = match &self.phase {
            Phase::Active { origin, head } => (origin.clone(), head.clone()),
            _ => return Err(StreamError::NotInitialized),
        };
        if request.input().commitment() != head.commitment() {
            return Err(StreamError::StaleTransition {
                expected: head.commitment(),
                found: request.input().commitment(),
            });
        }
        match request.kind() {
            TransitionKind::Partial { next_head } => {
                let new_head = next_head.commitment();
                info!(
                    from = %head.commitment().short(),
                    to = %new_head.short(),
                    amount = next_head.amount(),
                    "stream head advanced"
                );
                self.phase = Phase::Active {
                    origin,
                    head: next_head.clone(),
                };
                Ok(AdvanceOutcome::Continued { new_head })
            }
            TransitionKind::Terminal { payout } => {
                info!(
                    head = %head.commitment().short(),
                    payout = ?payout.as_ref().map(|note| note.commitment().short()),
                    "stream closed"
                );
                self.phase = Phase::Closed { origin };
                Ok(AdvanceOutcome::Closed)
            }
        }
    }

    /// Commitment of the current head note; the handle callers use to query
    /// the note store for confirmation status.
    pub fn head_commitment(&self) -> Result<Commitment> {
        match &self.phase {
            Phase::Active { head, .. } => Ok(head.commitment()),
            _ => Err(StreamError::NotInitialized),
        }
    }

    /// The origin note, once the stream exists.
    pub fn origin(&self) -> Option<&Note> {
        match &self.phase {
            Phase::Uninitialized => None,
            Phase::Active { origin, .. } | Phase::Closed { origin } => Some(origin),
        }
    }

    /// The current head note while the stream is active.
    pub fn head(&self) -> Option<&Note> {
        match &self.phase {
            Phase::Active { head, .. } => Some(head),
            _ => None,
        }
    }

    /// Stream terms from the origin note, once the stream exists.
    pub fn terms(&self) -> Option<StreamTerms> {
        self.origin().and_then(|origin| origin.stream_terms().copied())
    }

    pub fn asset(&self) -> AssetId {
        self.asset
    }

    pub fn predicate(&self) -> PredicateId {
        self.predicate
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.phase, Phase::Closed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::STREAM_PREDICATE_V1;

    fn controller() -> StreamController {
        StreamController::new(AssetId::native(), *STREAM_PREDICATE_V1)
    }

    fn payer() -> OwnerId {
        OwnerId::derive(b"payer")
    }

    fn payee() -> OwnerId {
        OwnerId::derive(b"payee")
    }

    #[test]
    fn setup_computes_terms_and_activates() {
        let mut ctrl = controller();
        let origin = ctrl.setup(1_000_000_000, 1, 100, payer()).unwrap();

        assert!(ctrl.is_active());
        assert_eq!(origin.amount(), 1_000_000_000);
        assert_eq!(
            origin.stream_terms(),
            Some(&StreamTerms {
                end_slot: 101,
                rate: 1_000_000_000
            })
        );
        assert_eq!(origin.predicate(), Some(*STREAM_PREDICATE_V1));
        assert_eq!(ctrl.head_commitment().unwrap(), origin.commitment());
    }

    #[test]
    fn setup_twice_fails_and_preserves_head() {
        let mut ctrl = controller();
        let origin = ctrl.setup(900, 3, 100, payer()).unwrap();
        let err = ctrl.setup(500, 2, 200, payer()).unwrap_err();
        assert!(matches!(err, StreamError::AlreadyInitialized));
        assert_eq!(ctrl.head_commitment().unwrap(), origin.commitment());
    }

    #[test]
    fn setup_rejects_zero_duration() {
        let mut ctrl = controller();
        assert!(matches!(
            ctrl.setup(900, 0, 100, payer()),
            Err(StreamError::InvalidDuration(0))
        ));
        assert!(!ctrl.is_active());
    }

    #[test]
    fn setup_rejects_slot_horizon_overflow() {
        let mut ctrl = controller();
        assert!(matches!(
            ctrl.setup(900, u64::MAX, 100, payer()),
            Err(StreamError::InvalidDuration(_))
        ));
    }

    #[test]
    fn collect_before_setup_fails() {
        let ctrl = controller();
        assert!(matches!(
            ctrl.collect(100, CollectAction::Close),
            Err(StreamError::NotInitialized)
        ));
        assert!(ctrl.head_commitment().is_err());
    }

    #[test]
    fn partial_collect_conserves_value() {
        let mut ctrl = controller();
        let origin = ctrl.setup(900, 3, 100, payer()).unwrap();

        // end_slot-2: two slots of schedule left.
        let request = ctrl.collect(101, CollectAction::Close).unwrap();
        assert!(!request.is_terminal());
        assert_eq!(request.input(), &origin);
        assert_eq!(request.remaining_amount(), 600);
        assert_eq!(request.diff(), 0);
        assert_eq!(request.effective_slot(), 101);

        let next_head = request.output().unwrap();
        assert_eq!(next_head.amount(), 600);
        assert_eq!(next_head.owner(), payer());
        assert_eq!(next_head.stream_terms(), origin.stream_terms());
        assert_eq!(request.collected() + next_head.amount(), origin.amount());
        // Fresh randomness gives the continuation note a fresh handle even
        // though its terms repeat the origin's.
        assert_ne!(next_head.commitment(), origin.commitment());
    }

    #[test]
    fn same_slot_collect_keeps_full_amount() {
        let mut ctrl = controller();
        let origin = ctrl.setup(1_000_000_000, 1, 100, payer()).unwrap();
        let request = ctrl.collect(100, CollectAction::Close).unwrap();
        let next_head = request.output().unwrap();
        assert_eq!(next_head.amount(), origin.amount());
        assert_eq!(request.collected(), 0);
        assert_ne!(next_head.commitment(), origin.commitment());
    }

    #[test]
    fn collect_does_not_mutate_until_advanced() {
        let mut ctrl = controller();
        let origin = ctrl.setup(900, 3, 100, payer()).unwrap();
        let request = ctrl.collect(101, CollectAction::Close).unwrap();
        // Discarding a built transition is free of side effects.
        assert_eq!(ctrl.head_commitment().unwrap(), origin.commitment());

        ctrl.advance(&request).unwrap();
        assert_eq!(
            ctrl.head_commitment().unwrap(),
            request.output().unwrap().commitment()
        );
    }

    #[test]
    fn terminal_transfer_pays_head_minus_fee() {
        let mut ctrl = controller();
        ctrl.setup(1_000_000_000, 1, 100, payer()).unwrap();

        let request = ctrl
            .collect(101, CollectAction::Transfer { recipient: payee() })
            .unwrap();
        assert!(request.is_terminal());
        assert_eq!(request.diff(), 0);
        assert_eq!(request.effective_slot(), 101);
        assert_eq!(request.remaining_amount(), 0);

        let payout = request.output().unwrap();
        assert_eq!(payout.amount(), 1_000_000_000 - STREAM_CLOSE_FEE);
        assert_eq!(payout.owner(), payee());
        assert!(!payout.is_stream());
        assert!(payout.predicate().is_none());
    }

    #[test]
    fn terminal_close_produces_no_note() {
        let mut ctrl = controller();
        ctrl.setup(900, 3, 100, payer()).unwrap();
        let request = ctrl.collect(105, CollectAction::Close).unwrap();
        assert!(request.is_terminal());
        assert!(request.output().is_none());
        assert_eq!(request.diff(), 2);
        assert_eq!(request.collected(), 900);
    }

    #[test]
    fn terminal_transfer_needs_fee_coverage() {
        let mut ctrl = controller();
        ctrl.setup(50_000, 1, 100, payer()).unwrap();
        let err = ctrl
            .collect(101, CollectAction::Transfer { recipient: payee() })
            .unwrap_err();
        assert!(matches!(
            err,
            StreamError::InsufficientFunds {
                available: 50_000,
                required: STREAM_CLOSE_FEE
            }
        ));
        // The failed build left the stream untouched.
        assert!(ctrl.is_active());
    }

    #[test]
    fn advance_rejects_stale_request() {
        let mut ctrl = controller();
        ctrl.setup(900, 3, 100, payer()).unwrap();
        let first = ctrl.collect(101, CollectAction::Close).unwrap();
        ctrl.advance(&first).unwrap();

        // Replaying the already-applied transition no longer matches the head.
        let err = ctrl.advance(&first).unwrap_err();
        assert!(matches!(err, StreamError::StaleTransition { .. }));
    }

    #[test]
    fn terminal_advance_closes_the_stream() {
        let mut ctrl = controller();
        ctrl.setup(900, 3, 100, payer()).unwrap();
        let request = ctrl.collect(103, CollectAction::Close).unwrap();
        assert_eq!(ctrl.advance(&request).unwrap(), AdvanceOutcome::Closed);

        assert!(ctrl.is_closed());
        assert!(matches!(
            ctrl.collect(104, CollectAction::Close),
            Err(StreamError::NotInitialized)
        ));
        assert!(ctrl.head_commitment().is_err());
        // The origin stays readable for restore and audit.
        assert!(ctrl.origin().is_some());
    }

    #[test]
    fn restore_requires_a_consistent_pair() {
        let mut ctrl = controller();
        let origin = ctrl.setup(900, 3, 100, payer()).unwrap();
        let request = ctrl.collect(101, CollectAction::Close).unwrap();
        let head = request.output().unwrap().clone();

        let restored = StreamController::restore(origin.clone(), head.clone()).unwrap();
        assert_eq!(restored.head_commitment().unwrap(), head.commitment());
        assert_eq!(restored.terms(), origin.stream_terms().copied());

        let foreign = Note::plain(
            AssetId::native(),
            900,
            payer(),
            NoteRandomness::from_bytes([3u8; 32]),
        );
        assert!(matches!(
            StreamController::restore(origin, foreign),
            Err(StreamError::SchemaMismatch { .. })
        ));
    }
}
