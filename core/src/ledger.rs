//! Per-partition ledger state machine.
//!
//! One [`PartitionLedger`] exists per partition key (a venue/date/session
//! composite), lazily created on first reference. It tracks the first
//! non-zero capacity observed for the key, the registry of currently open
//! holds, and the aggregate held/confirmed totals. After a full replay the
//! evaluator checks two invariants per ledger:
//!
//! - `held_total >= 0`
//! - `held_total + confirmed_total <= capacity` whenever `capacity > 0`
//!
//! The ledger never blocks or reorders: an out-of-order release before its
//! create flows through the unmatched-termination path below, and the
//! resulting negative total is exactly what the negative-held check exists
//! to catch.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Policy for resolving a release/confirm whose `hold_id` is not in the
/// open-hold registry.
///
/// The producers disagree here: the inventory service trusts its own
/// registry, while the exported event carries a quantity of its own. Making
/// the choice explicit keeps the negative-held detector's sensitivity
/// tunable and lets tests exercise both behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnmatchedHoldPolicy {
    /// Trust the event: subtract the quantity carried on the event itself.
    /// This can drive `held_total` negative, surfacing unmatched
    /// terminations as negative-held violations.
    #[default]
    FallbackToEventQty,
    /// Trust the registry: an unmatched termination has no ledger effect.
    StrictRegistryOnly,
}

/// Outcome of resolving a release/confirm against the open-hold registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldTermination {
    /// The hold was open; its registered quantity was applied.
    Matched(i64),
    /// The hold was unknown; the event's own quantity was applied
    /// ([`UnmatchedHoldPolicy::FallbackToEventQty`]).
    Fallback(i64),
    /// The hold was unknown and the policy forbids fallback; no ledger
    /// effect.
    Unmatched,
}

impl HoldTermination {
    /// The quantity that was applied to the ledger, if any.
    #[must_use]
    pub const fn applied_qty(&self) -> Option<i64> {
        match self {
            Self::Matched(qty) | Self::Fallback(qty) => Some(*qty),
            Self::Unmatched => None,
        }
    }

    /// True when the hold id was not found in the registry.
    #[must_use]
    pub const fn is_unmatched(&self) -> bool {
        matches!(self, Self::Fallback(_) | Self::Unmatched)
    }
}

/// Ledger state for one partition key.
///
/// Mutated only by the replay's event-application step; never deleted,
/// accumulating for the lifetime of a validation run. Serializable so a
/// continuous runner can snapshot it into a checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionLedger {
    /// First non-zero capacity observed for this key; `0` until then.
    capacity: i64,
    /// Open holds: `hold_id → qty` as registered at creation.
    open_holds: HashMap<String, i64>,
    /// Sum of qty for currently open holds.
    held_total: i64,
    /// Cumulative qty moved from held to confirmed.
    confirmed_total: i64,
}

impl PartitionLedger {
    /// Applies a `hold_created` event. The caller has already validated
    /// `qty > 0` and a non-empty `hold_id` at the classification boundary.
    ///
    /// Capacity is sticky: the first non-zero value observed for the key
    /// wins, and later creates do not overwrite it.
    pub fn hold_created(&mut self, hold_id: &str, qty: i64, capacity: i64) {
        if capacity > 0 && self.capacity == 0 {
            self.capacity = capacity;
        }
        self.open_holds.insert(hold_id.to_string(), qty);
        self.held_total += qty;
    }

    /// Applies a `hold_released` event: the hold leaves the registry and
    /// its quantity leaves `held_total`.
    pub fn hold_released(&mut self, hold_id: &str, event_qty: i64, policy: UnmatchedHoldPolicy) -> HoldTermination {
        let termination = self.terminate(hold_id, event_qty, policy);
        if let Some(qty) = termination.applied_qty() {
            self.held_total -= qty;
        }
        termination
    }

    /// Applies a `hold_confirmed` event: the hold leaves the registry and
    /// its quantity moves from `held_total` to `confirmed_total`.
    pub fn hold_confirmed(&mut self, hold_id: &str, event_qty: i64, policy: UnmatchedHoldPolicy) -> HoldTermination {
        let termination = self.terminate(hold_id, event_qty, policy);
        if let Some(qty) = termination.applied_qty() {
            self.held_total -= qty;
            self.confirmed_total += qty;
        }
        termination
    }

    /// Removes a hold from the registry, resolving the quantity to apply.
    fn terminate(&mut self, hold_id: &str, event_qty: i64, policy: UnmatchedHoldPolicy) -> HoldTermination {
        match self.open_holds.remove(hold_id) {
            Some(registered) => HoldTermination::Matched(registered),
            None => match policy {
                UnmatchedHoldPolicy::FallbackToEventQty => HoldTermination::Fallback(event_qty),
                UnmatchedHoldPolicy::StrictRegistryOnly => HoldTermination::Unmatched,
            },
        }
    }

    /// First non-zero capacity observed for this key; `0` if none yet.
    #[must_use]
    pub const fn capacity(&self) -> i64 {
        self.capacity
    }

    /// Sum of qty for currently open holds.
    #[must_use]
    pub const fn held_total(&self) -> i64 {
        self.held_total
    }

    /// Cumulative qty confirmed (moved from held to sold).
    #[must_use]
    pub const fn confirmed_total(&self) -> i64 {
        self.confirmed_total
    }

    /// Number of currently open holds.
    #[must_use]
    pub fn open_hold_count(&self) -> usize {
        self.open_holds.len()
    }

    /// Negative-held invariant check, evaluated after full replay.
    #[must_use]
    pub const fn is_negative_held(&self) -> bool {
        self.held_total < 0
    }

    /// Over-capacity invariant check, evaluated after full replay. Keys
    /// that never advertised a capacity are exempt.
    #[must_use]
    pub const fn is_over_capacity(&self) -> bool {
        self.capacity > 0 && self.held_total + self.confirmed_total > self.capacity
    }
}
