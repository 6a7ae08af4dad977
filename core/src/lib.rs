//! # Reconcile Core
//!
//! Pure replay engine for the ticket-reservation saga's domain-event log.
//!
//! The engine folds an unordered, duplicate-prone event stream (order
//! creation → inventory hold → payment confirmation → ticket issuance) into
//! per-partition ledger state and per-order lifecycle state, then evaluates
//! derived consistency invariants over the final state:
//!
//! - no partition ever sells past its capacity
//! - no partition's held quantity goes negative
//! - no ticket is issued for an unpaid order
//! - no event id is delivered twice
//!
//! ## Architecture
//!
//! - **Envelope**: the raw log record plus payload normalization and the
//!   typed [`envelope::DomainEvent`] sum over the known event kinds
//! - **Ledger**: per-partition capacity / held / confirmed state machine
//! - **Lifecycle**: per-order paid / ticketed set membership
//! - **Replay**: the explicit accumulator and the pure fold step
//! - **Verdict**: terminal evaluation into the external result schema
//!
//! All state is owned by one [`replay::ReplayState`] value threaded through a
//! single fold; there are no process-level singletons, so the engine embeds
//! in batch tools, continuous runners, or sharded workers alike.
//!
//! ## Example
//!
//! ```
//! use reconcile_core::replay::{replay, ReplayState};
//! use reconcile_core::source::VecSource;
//! use reconcile_core::verdict::Verdict;
//!
//! # fn main() -> Result<(), reconcile_core::source::SourceError> {
//! let source = VecSource::new(vec![]);
//! let state = replay(source, ReplayState::default())?;
//! let verdict = Verdict::evaluate(&state);
//! assert!(verdict.ok);
//! # Ok(())
//! # }
//! ```

pub mod envelope;
pub mod ledger;
pub mod lifecycle;
pub mod replay;
pub mod source;
pub mod verdict;

pub use envelope::{DomainEvent, EventEnvelope, InvalidEvent};
pub use ledger::{PartitionLedger, UnmatchedHoldPolicy};
pub use lifecycle::OrderLifecycle;
pub use replay::{replay, ReplayState};
pub use source::{EventSource, SourceError, VecSource};
pub use verdict::Verdict;
