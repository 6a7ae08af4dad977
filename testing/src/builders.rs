//! Envelope builders for the saga's event kinds.
//!
//! Builders produce exactly the shape the exported log carries, so tests
//! read like log excerpts. `double_wrapped` reproduces the known producer
//! quirk of nesting the payload one extra level.

use reconcile_core::envelope::EventEnvelope;
use serde_json::{json, Value};
use uuid::Uuid;

/// A fresh random event id.
#[must_use]
pub fn event_id() -> String {
    Uuid::new_v4().to_string()
}

/// A `hold_created` envelope.
#[must_use]
pub fn hold_created(event_id: &str, partition_key: &str, hold_id: &str, qty: i64, capacity: i64) -> EventEnvelope {
    EventEnvelope {
        event_id: event_id.to_string(),
        event_type: "hold_created".to_string(),
        aggregate_id: String::new(),
        payload: json!({
            "partition_key": partition_key,
            "hold_id": hold_id,
            "qty": qty,
            "capacity": capacity,
        }),
    }
}

/// A `hold_released` envelope.
#[must_use]
pub fn hold_released(event_id: &str, partition_key: &str, hold_id: &str, qty: i64) -> EventEnvelope {
    EventEnvelope {
        event_id: event_id.to_string(),
        event_type: "hold_released".to_string(),
        aggregate_id: String::new(),
        payload: json!({
            "partition_key": partition_key,
            "hold_id": hold_id,
            "qty": qty,
        }),
    }
}

/// A `hold_confirmed` envelope.
#[must_use]
pub fn hold_confirmed(event_id: &str, partition_key: &str, hold_id: &str, qty: i64) -> EventEnvelope {
    EventEnvelope {
        event_id: event_id.to_string(),
        event_type: "hold_confirmed".to_string(),
        aggregate_id: String::new(),
        payload: json!({
            "partition_key": partition_key,
            "hold_id": hold_id,
            "qty": qty,
        }),
    }
}

/// An `OrderPaid` envelope for the given aggregate.
#[must_use]
pub fn order_paid(event_id: &str, order_id: &str) -> EventEnvelope {
    EventEnvelope {
        event_id: event_id.to_string(),
        event_type: "OrderPaid".to_string(),
        aggregate_id: order_id.to_string(),
        payload: Value::Object(serde_json::Map::new()),
    }
}

/// A `TicketIssued` envelope for the given aggregate.
#[must_use]
pub fn ticket_issued(event_id: &str, order_id: &str) -> EventEnvelope {
    EventEnvelope {
        event_id: event_id.to_string(),
        event_type: "TicketIssued".to_string(),
        aggregate_id: order_id.to_string(),
        payload: Value::Object(serde_json::Map::new()),
    }
}

/// Wraps an envelope's payload one extra level under a `payload` key,
/// reproducing the double-wrapping producer quirk.
#[must_use]
pub fn double_wrapped(mut envelope: EventEnvelope) -> EventEnvelope {
    envelope.payload = json!({ "payload": envelope.payload });
    envelope
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile_core::envelope::DomainEvent;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn double_wrapped_classifies_like_flat() {
        let flat = hold_created("E1", "K", "H1", 2, 5);
        let wrapped = double_wrapped(hold_created("E1", "K", "H1", 2, 5));

        assert_eq!(
            DomainEvent::classify(&flat).unwrap(),
            DomainEvent::classify(&wrapped).unwrap()
        );
    }
}
