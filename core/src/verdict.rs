//! Terminal invariant evaluation and the external result schema.
//!
//! The verdict is a pure function of the final replay state, produced once
//! after the full stream is consumed. All violation categories carry equal
//! weight: any non-empty category fails the run.

use crate::envelope::InvalidEvent;
use crate::replay::ReplayState;
use serde::{Deserialize, Serialize};

/// Result of one full replay, in the external JSON schema.
///
/// List fields are sorted; `invalid_events` keeps arrival order, matching
/// the exported log. The schema is frozen, since consumers (failure drills,
/// dashboards) parse it verbatim; new findings go to logs, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    /// Partition keys whose held total ended below zero.
    pub negative_held_keys: Vec<String>,
    /// Partition keys where held + confirmed exceeded capacity.
    pub over_capacity_keys: Vec<String>,
    /// Orders ticketed without a prior payment.
    pub ticketed_without_paid: Vec<String>,
    /// Event ids delivered more than once.
    pub duplicate_event_ids: Vec<String>,
    /// Recognized events with structurally wrong payloads.
    pub invalid_events: Vec<InvalidEvent>,
    /// Overall pass: true iff every list above is empty.
    pub ok: bool,
}

impl Verdict {
    /// Evaluates the final state into a verdict.
    ///
    /// Ledger keys come out sorted because the state keys its ledgers with
    /// an ordered map; no category is weighted.
    #[must_use]
    pub fn evaluate(state: &ReplayState) -> Self {
        let negative_held_keys: Vec<String> = state
            .ledgers()
            .iter()
            .filter(|(_, ledger)| ledger.is_negative_held())
            .map(|(key, _)| key.clone())
            .collect();

        let over_capacity_keys: Vec<String> = state
            .ledgers()
            .iter()
            .filter(|(_, ledger)| ledger.is_over_capacity())
            .map(|(key, _)| key.clone())
            .collect();

        let ticketed_without_paid = state.lifecycle().ticketed_without_paid();
        let duplicate_event_ids: Vec<String> =
            state.duplicate_event_ids().iter().cloned().collect();
        let invalid_events = state.invalid_events().to_vec();

        let ok = negative_held_keys.is_empty()
            && over_capacity_keys.is_empty()
            && ticketed_without_paid.is_empty()
            && duplicate_event_ids.is_empty()
            && invalid_events.is_empty();

        Self {
            negative_held_keys,
            over_capacity_keys,
            ticketed_without_paid,
            duplicate_event_ids,
            invalid_events,
            ok,
        }
    }
}
