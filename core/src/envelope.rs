//! Raw event envelopes, payload normalization, and typed event classification.
//!
//! Every record in the exported event log is an [`EventEnvelope`]: an id, a
//! type tag, an aggregate id, and a loosely-typed JSON payload. This module
//! is the deserialization boundary: field presence and types are checked
//! here, once, so the ledger logic downstream only ever sees well-formed
//! [`DomainEvent`] values or recorded [`InvalidEvent`] findings.
//!
//! # Payload double-wrapping
//!
//! One producer wraps the real payload a second time under a key literally
//! named `payload` inside the outer `payload` field. [`EventEnvelope::effective_payload`]
//! unwraps exactly one level when that shape is present, so validation does
//! not spuriously fail on the cosmetic nesting, and so a pathological
//! triple-nested payload is *not* flattened further.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw event record as it appears in the append-only export.
///
/// Envelopes are immutable once read; identity is `event_id`. The same
/// envelope may appear more than once in the stream; duplicate delivery is
/// a condition the replay detects, not one it prevents.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EventEnvelope {
    /// Producer-assigned event identity. May be empty for events from
    /// producers that predate id assignment; such events cannot be
    /// deduplicated.
    #[serde(default)]
    pub event_id: String,

    /// Event type tag, e.g. `hold_created` or `OrderPaid`. Unrecognized
    /// tags are ignored by the replay.
    #[serde(default)]
    pub event_type: String,

    /// The aggregate (order) this event belongs to.
    #[serde(default)]
    pub aggregate_id: String,

    /// Loosely-typed payload. May be absent, a map, or a map wrapped one
    /// extra time under a `payload` key.
    #[serde(default)]
    pub payload: Value,
}

impl EventEnvelope {
    /// Returns the effective payload map, unwrapping one level of
    /// double-wrapping when present.
    ///
    /// Absent or non-map payloads yield an empty map, so downstream field
    /// lookups fall through to their defaults instead of erroring at the
    /// transport layer.
    #[must_use]
    pub fn effective_payload(&self) -> Map<String, Value> {
        match &self.payload {
            Value::Object(outer) => match outer.get("payload") {
                // One level only: the inner map is returned as-is even if
                // it nests a further `payload` key.
                Some(Value::Object(inner)) => inner.clone(),
                _ => outer.clone(),
            },
            _ => Map::new(),
        }
    }
}

/// A recognized event whose payload was structurally wrong.
///
/// Invalid events are recorded, their ledger effects are skipped, and the
/// replay continues: a single run should surface every defect in the log
/// rather than stopping at the first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvalidEvent {
    /// The event type tag that failed validation.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable reason, stable across runs.
    pub reason: String,
    /// The offending envelope's event id (may be empty).
    pub event_id: String,
}

impl InvalidEvent {
    fn payload(envelope: &EventEnvelope) -> Self {
        Self {
            kind: envelope.event_type.clone(),
            reason: format!("invalid {} payload", envelope.event_type),
            event_id: envelope.event_id.clone(),
        }
    }
}

/// A typed domain event, classified from a raw envelope.
///
/// The five known kinds map onto the saga's hold and order lifecycles; an
/// explicit [`DomainEvent::Unrecognized`] fallback carries anything else so
/// new producer event types never abort a replay.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A hold was placed against a partition's capacity.
    HoldCreated {
        /// Sellable inventory pool the hold counts against.
        partition_key: String,
        /// Registry key for the hold.
        hold_id: String,
        /// Quantity reserved (validated positive).
        qty: i64,
        /// Capacity advertised by the producer; `0` when absent.
        capacity: i64,
    },
    /// A hold was released back to the pool without a sale.
    HoldReleased {
        /// Pool the hold counted against.
        partition_key: String,
        /// Registry key for the hold (may be unknown to the ledger).
        hold_id: String,
        /// Quantity carried on the event itself, used only as the
        /// fallback amount when the registry has no entry.
        qty: i64,
    },
    /// A hold transitioned from reserved to sold.
    HoldConfirmed {
        /// Pool the hold counted against.
        partition_key: String,
        /// Registry key for the hold (may be unknown to the ledger).
        hold_id: String,
        /// Fallback quantity, as for [`DomainEvent::HoldReleased`].
        qty: i64,
    },
    /// Payment was confirmed for an order.
    OrderPaid {
        /// The paid order.
        order_id: String,
    },
    /// A ticket was issued for an order.
    TicketIssued {
        /// The ticketed order.
        order_id: String,
    },
    /// Any event type this engine does not audit. Ignored, not an error.
    Unrecognized {
        /// The unrecognized type tag, kept for trace logging.
        event_type: String,
    },
}

impl DomainEvent {
    /// Classifies a raw envelope into a typed event, validating required
    /// fields for the recognized hold kinds.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidEvent`] finding when a recognized event type has
    /// a structurally wrong payload: a `hold_created` with an empty
    /// `hold_id` or non-positive `qty`, or any hold event whose `qty` or
    /// `capacity` is not an integer.
    pub fn classify(envelope: &EventEnvelope) -> Result<Self, InvalidEvent> {
        match envelope.event_type.as_str() {
            "hold_created" => {
                let payload = envelope.effective_payload();
                let hold_id = string_field(&payload, "hold_id");
                let qty = int_field(&payload, "qty").ok_or_else(|| InvalidEvent::payload(envelope))?;
                let capacity =
                    int_field(&payload, "capacity").ok_or_else(|| InvalidEvent::payload(envelope))?;
                if qty <= 0 || hold_id.is_empty() {
                    return Err(InvalidEvent {
                        kind: "hold_created".to_string(),
                        reason: "invalid hold_created payload".to_string(),
                        event_id: envelope.event_id.clone(),
                    });
                }
                Ok(Self::HoldCreated {
                    partition_key: partition_key(&payload),
                    hold_id,
                    qty,
                    capacity,
                })
            }
            "hold_released" => {
                let payload = envelope.effective_payload();
                let qty = int_field(&payload, "qty").ok_or_else(|| InvalidEvent::payload(envelope))?;
                Ok(Self::HoldReleased {
                    partition_key: partition_key(&payload),
                    hold_id: string_field(&payload, "hold_id"),
                    qty,
                })
            }
            "hold_confirmed" => {
                let payload = envelope.effective_payload();
                let qty = int_field(&payload, "qty").ok_or_else(|| InvalidEvent::payload(envelope))?;
                Ok(Self::HoldConfirmed {
                    partition_key: partition_key(&payload),
                    hold_id: string_field(&payload, "hold_id"),
                    qty,
                })
            }
            "OrderPaid" => Ok(Self::OrderPaid {
                order_id: envelope.aggregate_id.clone(),
            }),
            "TicketIssued" => Ok(Self::TicketIssued {
                order_id: envelope.aggregate_id.clone(),
            }),
            other => Ok(Self::Unrecognized {
                event_type: other.to_string(),
            }),
        }
    }
}

/// Partition key lookup with the export's documented default.
fn partition_key(payload: &Map<String, Value>) -> String {
    match payload.get("partition_key") {
        Some(Value::String(key)) => key.clone(),
        _ => "unknown".to_string(),
    }
}

fn string_field(payload: &Map<String, Value>, field: &str) -> String {
    match payload.get(field) {
        Some(Value::String(value)) => value.clone(),
        _ => String::new(),
    }
}

/// Integer field lookup. The Go producers emit JSON numbers, but some
/// export paths stringify them; both are accepted. Absent fields default to
/// zero; present-but-non-integer values are `None` (structural error).
fn int_field(payload: &Map<String, Value>, field: &str) -> Option<i64> {
    match payload.get(field) {
        None | Some(Value::Null) => Some(0),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        Some(_) => None,
    }
}
