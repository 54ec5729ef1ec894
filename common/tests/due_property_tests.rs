// Property-based tests for cadence due-state tracking

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::cadence::Cadence;
use common::scheduler::DueTracker;
use proptest::prelude::*;

// ============================================================================
// Property Generators
// ============================================================================

fn arb_cadence() -> impl Strategy<Value = Cadence> {
    prop::sample::select(Cadence::ALL.to_vec())
}

/// Generate an instant within roughly the first sixty years of the epoch
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..2_000_000_000i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

// ============================================================================
// Property Tests
// ============================================================================

/// *For any* cadence and instant, a tracker without a recorded success
/// reports the cadence as due.
#[test]
fn property_unknown_cadence_is_always_due() {
    proptest!(ProptestConfig::with_cases(100), |(
        cadence in arb_cadence(),
        now in arb_instant()
    )| {
        let tracker = DueTracker::new();
        prop_assert!(tracker.is_due(cadence, now));
    });
}

/// *For any* cadence, success time and offset, the cadence is due at
/// `t + offset` exactly when the offset reaches the cadence interval.
/// The boundary itself counts as due.
#[test]
fn property_due_exactly_when_interval_elapsed() {
    proptest!(ProptestConfig::with_cases(100), |(
        cadence in arb_cadence(),
        t in arb_instant(),
        offset_secs in 0i64..700_000i64
    )| {
        let mut tracker = DueTracker::new();
        tracker.mark_succeeded(cadence, t);

        let now = t + Duration::seconds(offset_secs);
        let expected = Duration::seconds(offset_secs) >= cadence.interval();
        prop_assert_eq!(tracker.is_due(cadence, now), expected);
    });
}

/// *For any* cadence, a success recorded at `t` re-arms it immediately:
/// the cadence is not due again at the same instant.
#[test]
fn property_success_immediately_rearms() {
    proptest!(ProptestConfig::with_cases(100), |(
        cadence in arb_cadence(),
        t in arb_instant()
    )| {
        let mut tracker = DueTracker::new();
        tracker.mark_succeeded(cadence, t);
        prop_assert!(!tracker.is_due(cadence, t));
    });
}

/// *For any* pair of distinct cadences, marking one succeeded leaves the
/// other untouched and still due.
#[test]
fn property_marking_one_cadence_leaves_others_due() {
    proptest!(ProptestConfig::with_cases(100), |(
        marked in arb_cadence(),
        t in arb_instant()
    )| {
        let mut tracker = DueTracker::new();
        tracker.mark_succeeded(marked, t);

        for other in Cadence::ALL {
            if other != marked {
                prop_assert!(tracker.is_due(other, t));
                prop_assert_eq!(tracker.last_success(other), None);
            }
        }
    });
}

/// *For any* two successes in order, the later one wins: due-state is
/// computed from the most recent success only.
#[test]
fn property_later_success_overrides_earlier() {
    proptest!(ProptestConfig::with_cases(100), |(
        cadence in arb_cadence(),
        t in arb_instant(),
        delta_secs in 1i64..1_000_000i64
    )| {
        let mut tracker = DueTracker::new();
        let later = t + Duration::seconds(delta_secs);

        tracker.mark_succeeded(cadence, t);
        tracker.mark_succeeded(cadence, later);

        prop_assert_eq!(tracker.last_success(cadence), Some(later));
        prop_assert!(!tracker.is_due(cadence, later));
    });
}

/// *For any* tracker state, evaluating due-ness has no side effects:
/// repeated checks at the same instant agree and leave the state intact.
#[test]
fn property_is_due_is_pure() {
    proptest!(ProptestConfig::with_cases(100), |(
        cadence in arb_cadence(),
        t in arb_instant(),
        offset_secs in 0i64..700_000i64
    )| {
        let mut tracker = DueTracker::new();
        tracker.mark_succeeded(cadence, t);

        let now = t + Duration::seconds(offset_secs);
        let first = tracker.is_due(cadence, now);
        let second = tracker.is_due(cadence, now);

        prop_assert_eq!(first, second);
        prop_assert_eq!(tracker.last_success(cadence), Some(t));
    });
}
