//! The event source seam and its fatal error taxonomy.
//!
//! An [`EventSource`] yields a lazy, finite, forward-only sequence of raw
//! envelopes from an external log. The trait imposes no ordering; the
//! replay requires (from the source's own guarantees) that events touching
//! the same hold or the same aggregate arrive in causal order.
//!
//! Backends live in adapter crates (`reconcile-jsonl` for append-only
//! file exports); [`VecSource`] here covers embedding and tests.

use crate::envelope::EventEnvelope;
use thiserror::Error;

/// Fatal transport-level failure: the run aborts with no partial verdict.
///
/// Malformed payload *content* is not a `SourceError`: recognized events
/// with structurally wrong fields are recorded per-event and the replay
/// continues.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The log could not be opened or read.
    #[error("failed to read event log: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be parsed as a well-formed envelope.
    #[error("malformed event record at line {line}: {reason}")]
    Malformed {
        /// 1-based line (or record) number in the source.
        line: u64,
        /// Parser diagnostic.
        reason: String,
    },
}

/// A lazy, finite, forward-only sequence of raw event envelopes.
///
/// Restartable only by re-opening the same source; there is no seek or
/// rewind. `Ok(None)` means the source is currently exhausted; for an
/// append-only log a later call may yield further events, which is what
/// continuous runners rely on.
pub trait EventSource {
    /// Pulls the next envelope, `Ok(None)` when (currently) exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the underlying log cannot be read or a
    /// record cannot be parsed; the caller must abort the run.
    fn next_event(&mut self) -> Result<Option<EventEnvelope>, SourceError>;
}

/// In-memory source over a fixed set of envelopes.
#[derive(Debug)]
pub struct VecSource {
    events: std::vec::IntoIter<EventEnvelope>,
}

impl VecSource {
    /// Wraps a vector of envelopes as a source.
    #[must_use]
    pub fn new(events: Vec<EventEnvelope>) -> Self {
        Self {
            events: events.into_iter(),
        }
    }
}

impl EventSource for VecSource {
    fn next_event(&mut self) -> Result<Option<EventEnvelope>, SourceError> {
        Ok(self.events.next())
    }
}
