//! Pure schedule math for streaming notes.
//!
//! Every amount produced here must be bit-exact against what the unlock
//! predicate's circuit independently recomputes, so the formulas stay in
//! plain integer arithmetic: floor division for the rate, widened
//! multiplication with a clamp for the remainder.

use crate::error::{Result, StreamError};
use zkps_note::StreamTerms;

/// Units released per slot: `amount / duration_slots`, floor division.
///
/// Because of the floor, `rate * duration_slots` may be strictly less than
/// `amount`; the residual stays in the head note and is paid out by the
/// terminal collection rather than being lost.
pub fn compute_rate(amount: u64, duration_slots: u64) -> Result<u64> {
    if duration_slots == 0 {
        return Err(StreamError::InvalidDuration(duration_slots));
    }
    Ok(amount / duration_slots)
}

/// Balance still locked at `current_slot`.
///
/// Zero at or after `end_slot`; otherwise `rate * (end_slot - current_slot)`,
/// computed in u128 and clamped to `head_amount` so rounding can never claim
/// more than the head still holds after earlier partial collections.
pub fn remaining_amount(terms: &StreamTerms, head_amount: u64, current_slot: u64) -> u64 {
    if current_slot >= terms.end_slot {
        return 0;
    }
    let slots_left = terms.end_slot - current_slot;
    let locked = u128::from(terms.rate) * u128::from(slots_left);
    u64::try_from(locked).map_or(head_amount, |locked| locked.min(head_amount))
}

/// Whether the stream has reached its end slot.
pub fn is_matured(terms: &StreamTerms, current_slot: u64) -> bool {
    current_slot >= terms.end_slot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(end_slot: u64, rate: u64) -> StreamTerms {
        StreamTerms { end_slot, rate }
    }

    #[test]
    fn rate_is_floor_division() {
        assert_eq!(compute_rate(900, 3).unwrap(), 300);
        assert_eq!(compute_rate(1_000_000_000, 1).unwrap(), 1_000_000_000);
        assert_eq!(compute_rate(1_000, 3).unwrap(), 333);
        assert_eq!(compute_rate(5, 10).unwrap(), 0);
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert!(matches!(
            compute_rate(900, 0),
            Err(StreamError::InvalidDuration(0))
        ));
    }

    #[test]
    fn remaining_matches_schedule() {
        // duration=3, amount=900, rate=300
        let t = terms(103, 300);
        assert_eq!(remaining_amount(&t, 900, 100), 900);
        assert_eq!(remaining_amount(&t, 900, 101), 600);
        assert_eq!(remaining_amount(&t, 900, 102), 300);
    }

    #[test]
    fn remaining_is_zero_at_and_after_maturity() {
        let t = terms(103, 300);
        assert_eq!(remaining_amount(&t, 900, 103), 0);
        assert_eq!(remaining_amount(&t, 900, 10_000), 0);
    }

    #[test]
    fn remaining_is_clamped_to_head_amount() {
        // After partial collections the head holds less than the full
        // schedule; the formula must never exceed it.
        let t = terms(103, 300);
        assert_eq!(remaining_amount(&t, 100, 100), 100);
        // Widened product larger than u64 still clamps cleanly.
        let wide = terms(u64::MAX, u64::MAX);
        assert_eq!(remaining_amount(&wide, 42, 0), 42);
    }

    #[test]
    fn maturity_boundary() {
        let t = terms(101, 1_000_000_000);
        assert!(!is_matured(&t, 100));
        assert!(is_matured(&t, 101));
        assert!(is_matured(&t, 102));
    }

    #[test]
    fn unlock_is_monotonic() {
        let t = terms(200, 7);
        let mut last = u64::MAX;
        for slot in 100..200 {
            let remaining = remaining_amount(&t, 1_000, slot);
            assert!(remaining <= last, "remaining grew at slot {}", slot);
            last = remaining;
        }
    }
}
