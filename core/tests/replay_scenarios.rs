//! End-to-end replay scenarios over in-memory streams.
//!
//! Each test folds a small log excerpt and checks the verdict, mirroring
//! the anomaly classes the engine exists to surface: oversell, negative
//! holds, tickets without payment, duplicate delivery, and malformed
//! producer payloads.

#![allow(clippy::expect_used)]

use reconcile_core::{replay, ReplayState, UnmatchedHoldPolicy, VecSource, Verdict};
use reconcile_testing::{builders, ReplayTest};

#[test]
fn clean_saga_passes() {
    ReplayTest::new()
        .given_events(vec![
            builders::hold_created("E1", "K", "H1", 3, 5),
            builders::hold_confirmed("E2", "K", "H1", 3),
            builders::order_paid("E3", "H1"),
            builders::ticket_issued("E4", "H1"),
        ])
        .then_verdict(|verdict| {
            assert!(verdict.ok);
            assert!(verdict.negative_held_keys.is_empty());
            assert!(verdict.over_capacity_keys.is_empty());
            assert!(verdict.ticketed_without_paid.is_empty());
            assert!(verdict.duplicate_event_ids.is_empty());
            assert!(verdict.invalid_events.is_empty());
        })
        .run();
}

#[test]
fn open_holds_beyond_capacity_fail_over_capacity() {
    ReplayTest::new()
        .given_events(vec![
            builders::hold_created("E1", "K", "H1", 3, 5),
            builders::hold_created("E2", "K", "H2", 4, 5),
        ])
        .then_state(|state| {
            assert_eq!(state.ledgers()["K"].held_total(), 7);
            assert_eq!(state.ledgers()["K"].capacity(), 5);
        })
        .then_verdict(|verdict| {
            assert!(!verdict.ok);
            assert_eq!(verdict.over_capacity_keys, vec!["K".to_string()]);
        })
        .run();
}

#[test]
fn ticket_without_payment_fails() {
    ReplayTest::new()
        .given_events(vec![builders::ticket_issued("E1", "O1")])
        .then_verdict(|verdict| {
            assert!(!verdict.ok);
            assert_eq!(verdict.ticketed_without_paid, vec!["O1".to_string()]);
        })
        .run();
}

#[test]
fn duplicate_event_id_fails_even_across_types() {
    ReplayTest::new()
        .given_events(vec![
            builders::hold_created("E1", "K", "H1", 1, 10),
            builders::order_paid("E1", "O1"),
        ])
        .then_verdict(|verdict| {
            assert!(!verdict.ok);
            assert_eq!(verdict.duplicate_event_ids, vec!["E1".to_string()]);
        })
        .run();
}

#[test]
fn empty_hold_id_is_recorded_without_ledger_mutation() {
    ReplayTest::new()
        .given_events(vec![builders::hold_created("E1", "K", "", 1, 5)])
        .then_state(|state| assert!(state.ledgers().is_empty()))
        .then_verdict(|verdict| {
            assert!(!verdict.ok);
            assert_eq!(verdict.invalid_events.len(), 1);
            assert_eq!(verdict.invalid_events[0].reason, "invalid hold_created payload");
            assert_eq!(verdict.invalid_events[0].event_id, "E1");
        })
        .run();
}

#[test]
fn wrapped_and_flat_payloads_yield_identical_verdicts() {
    let flat = vec![
        builders::hold_created("E1", "K", "H1", 2, 5),
        builders::hold_released("E2", "K", "H1", 2),
    ];
    let wrapped: Vec<_> = flat.clone().into_iter().map(builders::double_wrapped).collect();

    let state_flat =
        replay(VecSource::new(flat), ReplayState::default()).expect("replay should succeed");
    let state_wrapped =
        replay(VecSource::new(wrapped), ReplayState::default()).expect("replay should succeed");

    assert_eq!(Verdict::evaluate(&state_flat), Verdict::evaluate(&state_wrapped));
    assert_eq!(state_flat.ledgers(), state_wrapped.ledgers());
}

#[test]
fn stale_release_drives_held_negative_under_fallback_policy() {
    ReplayTest::new()
        .given_policy(UnmatchedHoldPolicy::FallbackToEventQty)
        .given_events(vec![
            builders::hold_created("E1", "K", "H1", 2, 10),
            builders::hold_released("E2", "K", "H1", 2),
            // Duplicate release from a retrying producer, new event id.
            builders::hold_released("E3", "K", "H1", 2),
        ])
        .then_state(|state| assert_eq!(state.unmatched_terminations(), 1))
        .then_verdict(|verdict| {
            assert!(!verdict.ok);
            assert_eq!(verdict.negative_held_keys, vec!["K".to_string()]);
        })
        .run();
}

#[test]
fn strict_policy_keeps_stale_release_out_of_the_ledger() {
    ReplayTest::new()
        .given_policy(UnmatchedHoldPolicy::StrictRegistryOnly)
        .given_events(vec![
            builders::hold_created("E1", "K", "H1", 2, 10),
            builders::hold_released("E2", "K", "H1", 2),
            builders::hold_released("E3", "K", "H1", 2),
        ])
        .then_state(|state| assert_eq!(state.unmatched_terminations(), 1))
        .then_verdict(|verdict| {
            assert!(verdict.ok);
        })
        .run();
}

#[test]
fn generated_event_ids_never_trip_the_dedup_guard() {
    let events: Vec<_> = (0..32)
        .map(|i| builders::hold_created(&builders::event_id(), "K", &format!("H{i}"), 1, 100))
        .collect();

    ReplayTest::new()
        .given_events(events)
        .then_state(|state| assert_eq!(state.events_folded(), 32))
        .then_verdict(|verdict| {
            assert!(verdict.ok);
            assert!(verdict.duplicate_event_ids.is_empty());
        })
        .run();
}

#[test]
fn unrecognized_event_types_are_ignored() {
    ReplayTest::new()
        .given_events(vec![
            builders::order_paid("E1", "O1"),
            reconcile_core::envelope::EventEnvelope {
                event_id: "E2".to_string(),
                event_type: "OrderCreated".to_string(),
                aggregate_id: "O1".to_string(),
                payload: serde_json::json!({"anything": true}),
            },
        ])
        .then_verdict(|verdict| assert!(verdict.ok))
        .run();
}

#[test]
fn replaying_the_same_log_twice_yields_identical_verdicts() {
    let log = vec![
        builders::hold_created("E1", "K", "H1", 3, 5),
        builders::hold_confirmed("E2", "K", "H1", 3),
        builders::hold_created("E3", "K2", "H2", 2, 0),
        builders::order_paid("E4", "O1"),
        builders::ticket_issued("E5", "O1"),
        builders::ticket_issued("E6", "O2"),
    ];

    let first = replay(VecSource::new(log.clone()), ReplayState::default())
        .expect("replay should succeed");
    let second =
        replay(VecSource::new(log), ReplayState::default()).expect("replay should succeed");

    assert_eq!(Verdict::evaluate(&first), Verdict::evaluate(&second));
}
