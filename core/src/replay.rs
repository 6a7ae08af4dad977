//! The replay accumulator and fold step.
//!
//! [`ReplayState`] owns everything one validation run accumulates: the
//! partition ledgers, the order lifecycle sets, the dedup guard, and the
//! invalid-event list. It is an explicit value threaded through a single
//! fold from `(state, envelope)` to `state`, never a process-level singleton,
//! so the engine embeds in batch tools, continuous runners, or workers
//! sharded by partition key.
//!
//! Duplicate event ids are recorded but do **not** suppress folding: the
//! messaging layer is at-least-once, and replaying the duplicate's effects
//! is precisely how non-idempotent producers get surfaced.

use crate::envelope::{DomainEvent, EventEnvelope, InvalidEvent};
use crate::ledger::{PartitionLedger, UnmatchedHoldPolicy};
use crate::lifecycle::OrderLifecycle;
use crate::source::{EventSource, SourceError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

/// Accumulated state of one validation run.
///
/// Serializable so a continuous runner can persist it, together with the
/// stream position, as one checkpoint document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayState {
    policy: UnmatchedHoldPolicy,
    ledgers: BTreeMap<String, PartitionLedger>,
    lifecycle: OrderLifecycle,
    seen_event_ids: HashSet<String>,
    duplicate_event_ids: BTreeSet<String>,
    invalid_events: Vec<InvalidEvent>,
    unmatched_terminations: u64,
    events_folded: u64,
}

impl ReplayState {
    /// Fresh state using the given unmatched-hold policy.
    #[must_use]
    pub fn with_policy(policy: UnmatchedHoldPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Folds one envelope into the state.
    ///
    /// This is the whole per-event pipeline: dedup tracking, payload
    /// normalization and classification, then ledger or lifecycle effects.
    /// Nothing here is fatal: structural problems are recorded and the
    /// fold continues.
    pub fn apply(&mut self, envelope: &EventEnvelope) {
        self.events_folded += 1;
        self.track_event_id(envelope);

        let event = match DomainEvent::classify(envelope) {
            Ok(event) => event,
            Err(invalid) => {
                warn!(
                    event_type = %invalid.kind,
                    event_id = %invalid.event_id,
                    "recorded invalid event payload"
                );
                self.invalid_events.push(invalid);
                return;
            }
        };

        match event {
            DomainEvent::HoldCreated {
                partition_key,
                hold_id,
                qty,
                capacity,
            } => {
                self.ledger_mut(&partition_key).hold_created(&hold_id, qty, capacity);
            }
            DomainEvent::HoldReleased {
                partition_key,
                hold_id,
                qty,
            } => {
                let policy = self.policy;
                let termination = self.ledger_mut(&partition_key).hold_released(&hold_id, qty, policy);
                self.note_termination(&partition_key, &hold_id, termination.is_unmatched());
            }
            DomainEvent::HoldConfirmed {
                partition_key,
                hold_id,
                qty,
            } => {
                let policy = self.policy;
                let termination = self.ledger_mut(&partition_key).hold_confirmed(&hold_id, qty, policy);
                self.note_termination(&partition_key, &hold_id, termination.is_unmatched());
            }
            DomainEvent::OrderPaid { order_id } => self.lifecycle.record_paid(&order_id),
            DomainEvent::TicketIssued { order_id } => self.lifecycle.record_ticketed(&order_id),
            DomainEvent::Unrecognized { event_type } => {
                debug!(%event_type, "ignoring unrecognized event type");
            }
        }
    }

    /// Dedup guard: record reuse of non-empty event ids. Empty ids cannot
    /// be deduplicated and are exempt; the event is folded either way.
    fn track_event_id(&mut self, envelope: &EventEnvelope) {
        if envelope.event_id.is_empty() {
            return;
        }
        if !self.seen_event_ids.insert(envelope.event_id.clone()) {
            warn!(event_id = %envelope.event_id, "duplicate event id delivered");
            self.duplicate_event_ids.insert(envelope.event_id.clone());
        }
    }

    fn note_termination(&mut self, partition_key: &str, hold_id: &str, unmatched: bool) {
        if unmatched {
            self.unmatched_terminations += 1;
            warn!(
                %partition_key,
                %hold_id,
                policy = ?self.policy,
                "release/confirm for a hold not in the open registry"
            );
        }
    }

    fn ledger_mut(&mut self, partition_key: &str) -> &mut PartitionLedger {
        self.ledgers.entry(partition_key.to_string()).or_default()
    }

    /// All partition ledgers touched by the run, keyed and iterated in
    /// sorted order.
    #[must_use]
    pub const fn ledgers(&self) -> &BTreeMap<String, PartitionLedger> {
        &self.ledgers
    }

    /// The order lifecycle sets.
    #[must_use]
    pub const fn lifecycle(&self) -> &OrderLifecycle {
        &self.lifecycle
    }

    /// Event ids that appeared more than once, sorted.
    #[must_use]
    pub const fn duplicate_event_ids(&self) -> &BTreeSet<String> {
        &self.duplicate_event_ids
    }

    /// Recognized events with structurally wrong payloads, in arrival order.
    #[must_use]
    pub fn invalid_events(&self) -> &[InvalidEvent] {
        &self.invalid_events
    }

    /// Releases/confirms that found no open hold in the registry. Not part
    /// of the verdict schema; exposed so operators can tell fallback-driven
    /// negative holds apart from registry-matched ones.
    #[must_use]
    pub const fn unmatched_terminations(&self) -> u64 {
        self.unmatched_terminations
    }

    /// Total envelopes folded, which is the stream position for
    /// checkpointing.
    #[must_use]
    pub const fn events_folded(&self) -> u64 {
        self.events_folded
    }

    /// The unmatched-hold policy this state was built with.
    #[must_use]
    pub const fn policy(&self) -> UnmatchedHoldPolicy {
        self.policy
    }
}

/// Drains a source into the given state, one envelope at a time.
///
/// Returns the final state once the source reports exhaustion. Passing in
/// the initial state (rather than constructing it here) is what lets a
/// continuous runner resume from a checkpointed snapshot.
///
/// # Errors
///
/// Propagates the first [`SourceError`]; per the error taxonomy the run
/// then aborts with no partial verdict.
pub fn replay<S: EventSource>(mut source: S, mut state: ReplayState) -> Result<ReplayState, SourceError> {
    while let Some(envelope) = source.next_event()? {
        state.apply(&envelope);
    }
    Ok(state)
}
