//! Property tests over randomly interleaved, causally-ordered event logs.
//!
//! The generators produce per-hold scripts (create, then optionally one
//! release or confirm) and merge them into a single stream under a random
//! interleaving that preserves each hold's causal order, the ordering
//! guarantee the engine requires from its source. Under that guarantee and
//! well-behaved producers, the ledger invariants must hold for every
//! interleaving.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use reconcile_core::{replay, ReplayState, VecSource, Verdict};
use reconcile_core::envelope::EventEnvelope;
use reconcile_testing::builders;

/// What happens to a hold after creation.
#[derive(Debug, Clone, Copy)]
enum Fate {
    Open,
    Released,
    Confirmed,
}

/// One hold's lifetime: partition key index, quantity, fate.
#[derive(Debug, Clone)]
struct HoldScript {
    key: usize,
    qty: i64,
    fate: Fate,
}

fn fate_strategy() -> impl Strategy<Value = Fate> {
    prop_oneof![Just(Fate::Open), Just(Fate::Released), Just(Fate::Confirmed)]
}

/// Up to two holds per key with qty <= 5 against capacity 10, so honest
/// producers can never oversell; keys are drawn from a small pool to force
/// ledger sharing.
fn scripts_strategy() -> impl Strategy<Value = Vec<HoldScript>> {
    prop::collection::vec(
        (0..4_usize, 1..=5_i64, fate_strategy())
            .prop_map(|(key, qty, fate)| HoldScript { key, qty, fate }),
        0..6,
    )
    .prop_filter("at most two holds per key", |scripts| {
        (0..4).all(|k| scripts.iter().filter(|s| s.key == k).count() <= 2)
    })
}

const CAPACITY: i64 = 10;

/// Expands each script into its causally-ordered event queue.
fn queues(scripts: &[HoldScript]) -> Vec<Vec<EventEnvelope>> {
    scripts
        .iter()
        .enumerate()
        .map(|(i, script)| {
            let key = format!("K{}", script.key);
            let hold_id = format!("H{i}");
            let mut queue = vec![builders::hold_created(
                &format!("E{i}-c"),
                &key,
                &hold_id,
                script.qty,
                CAPACITY,
            )];
            match script.fate {
                Fate::Open => {}
                Fate::Released => queue.push(builders::hold_released(
                    &format!("E{i}-r"),
                    &key,
                    &hold_id,
                    script.qty,
                )),
                Fate::Confirmed => queue.push(builders::hold_confirmed(
                    &format!("E{i}-x"),
                    &key,
                    &hold_id,
                    script.qty,
                )),
            }
            queue
        })
        .collect()
}

/// Merges the per-hold queues into one stream, preserving each queue's
/// internal order but interleaving across queues per the pick sequence.
fn interleave(mut queues: Vec<Vec<EventEnvelope>>, picks: &[usize]) -> Vec<EventEnvelope> {
    for queue in &mut queues {
        queue.reverse();
    }
    let mut merged = Vec::new();
    let mut pick_iter = picks.iter().copied().cycle();
    while queues.iter().any(|q| !q.is_empty()) {
        let live: Vec<usize> = (0..queues.len()).filter(|&i| !queues[i].is_empty()).collect();
        let pick = pick_iter.next().unwrap_or(0) % live.len();
        if let Some(event) = queues[live[pick]].pop() {
            merged.push(event);
        }
    }
    merged
}

fn stream_strategy() -> impl Strategy<Value = (Vec<HoldScript>, Vec<EventEnvelope>)> {
    (scripts_strategy(), prop::collection::vec(0..16_usize, 1..32)).prop_map(|(scripts, picks)| {
        let stream = interleave(queues(&scripts), &picks);
        (scripts, stream)
    })
}

proptest! {
    /// Causally-ordered terminations never drive a ledger negative,
    /// whatever the cross-hold interleaving.
    #[test]
    fn held_total_is_never_negative((_scripts, stream) in stream_strategy()) {
        let state = replay(VecSource::new(stream), ReplayState::default()).unwrap();
        for (key, ledger) in state.ledgers() {
            prop_assert!(ledger.held_total() >= 0, "negative held for {key}");
        }
        prop_assert!(Verdict::evaluate(&state).negative_held_keys.is_empty());
    }

    /// Honest producers (per-key demand within capacity) never trip the
    /// over-capacity check.
    #[test]
    fn capacity_holds_for_honest_producers((_scripts, stream) in stream_strategy()) {
        let state = replay(VecSource::new(stream), ReplayState::default()).unwrap();
        for (key, ledger) in state.ledgers() {
            prop_assert!(
                ledger.held_total() + ledger.confirmed_total() <= CAPACITY,
                "oversell on {key}"
            );
        }
        prop_assert!(Verdict::evaluate(&state).over_capacity_keys.is_empty());
    }

    /// Ledger totals are interleaving-independent: every merge order of the
    /// same scripts lands on the same final ledgers.
    #[test]
    fn totals_are_interleaving_independent(
        (scripts, stream) in stream_strategy(),
        other_picks in prop::collection::vec(0..16_usize, 1..32),
    ) {
        let reordered = interleave(queues(&scripts), &other_picks);

        let first = replay(VecSource::new(stream), ReplayState::default()).unwrap();
        let second = replay(VecSource::new(reordered), ReplayState::default()).unwrap();

        prop_assert_eq!(first.ledgers(), second.ledgers());
    }

    /// Replaying the same stream twice from fresh state is deterministic:
    /// no hidden global state carries over between runs.
    #[test]
    fn replay_is_deterministic((_scripts, stream) in stream_strategy()) {
        let first = replay(VecSource::new(stream.clone()), ReplayState::default()).unwrap();
        let second = replay(VecSource::new(stream), ReplayState::default()).unwrap();
        prop_assert_eq!(Verdict::evaluate(&first), Verdict::evaluate(&second));
    }

    /// Double-wrapping any subset of payloads changes nothing downstream.
    #[test]
    fn double_wrapping_is_invisible(
        (_scripts, stream) in stream_strategy(),
        wrap_mask in prop::collection::vec(any::<bool>(), 64),
    ) {
        let wrapped: Vec<EventEnvelope> = stream
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, event)| {
                if wrap_mask[i % wrap_mask.len()] {
                    builders::double_wrapped(event)
                } else {
                    event
                }
            })
            .collect();

        let plain = replay(VecSource::new(stream), ReplayState::default()).unwrap();
        let masked = replay(VecSource::new(wrapped), ReplayState::default()).unwrap();

        prop_assert_eq!(plain.ledgers(), masked.ledgers());
        prop_assert_eq!(Verdict::evaluate(&plain), Verdict::evaluate(&masked));
    }

    /// Every ticketed order generated after its payment stays clean.
    #[test]
    fn paid_before_ticketed_never_violates(order_count in 0..6_usize) {
        let mut events = Vec::new();
        for i in 0..order_count {
            events.push(builders::order_paid(&format!("P{i}"), &format!("O{i}")));
            events.push(builders::ticket_issued(&format!("T{i}"), &format!("O{i}")));
        }
        let state = replay(VecSource::new(events), ReplayState::default()).unwrap();
        prop_assert!(Verdict::evaluate(&state).ticketed_without_paid.is_empty());
    }
}
