//! Per-order lifecycle tracking.
//!
//! The saga's tail end is payment confirmation followed by ticket issuance.
//! The tracker records set membership for both and, after replay, reports
//! every ticketed order that was never paid, the signal that ticket
//! issuance raced or fired independently of payment confirmation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Paid / ticketed set membership across all orders seen in a replay.
///
/// Ordered sets keep the violation report deterministic without a separate
/// sort step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLifecycle {
    paid: BTreeSet<String>,
    ticketed: BTreeSet<String>,
}

impl OrderLifecycle {
    /// Records an `OrderPaid` event for the order.
    pub fn record_paid(&mut self, order_id: &str) {
        self.paid.insert(order_id.to_string());
    }

    /// Records a `TicketIssued` event for the order.
    pub fn record_ticketed(&mut self, order_id: &str) {
        self.ticketed.insert(order_id.to_string());
    }

    /// True if payment was confirmed for the order.
    #[must_use]
    pub fn is_paid(&self, order_id: &str) -> bool {
        self.paid.contains(order_id)
    }

    /// True if a ticket was issued for the order.
    #[must_use]
    pub fn is_ticketed(&self, order_id: &str) -> bool {
        self.ticketed.contains(order_id)
    }

    /// Orders holding a ticket without a prior payment, sorted.
    #[must_use]
    pub fn ticketed_without_paid(&self) -> Vec<String> {
        self.ticketed.difference(&self.paid).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_then_ticketed_is_clean() {
        let mut lifecycle = OrderLifecycle::default();
        lifecycle.record_paid("O1");
        lifecycle.record_ticketed("O1");
        assert!(lifecycle.ticketed_without_paid().is_empty());
    }

    #[test]
    fn ticket_without_payment_is_reported() {
        let mut lifecycle = OrderLifecycle::default();
        lifecycle.record_ticketed("O2");
        lifecycle.record_ticketed("O1");
        lifecycle.record_paid("O2");
        assert_eq!(lifecycle.ticketed_without_paid(), vec!["O1".to_string()]);
    }

    #[test]
    fn report_is_sorted() {
        let mut lifecycle = OrderLifecycle::default();
        for id in ["O3", "O1", "O2"] {
            lifecycle.record_ticketed(id);
        }
        assert_eq!(
            lifecycle.ticketed_without_paid(),
            vec!["O1".to_string(), "O2".to_string(), "O3".to_string()]
        );
    }
}
