//! # Reconcile Runtime
//!
//! Drivers around the pure replay core:
//!
//! - [`validate`]: one-shot batch run that drains the source and evaluates
//! - [`FollowRunner`]: continuous run that tails a growing export with
//!   cooperative shutdown and checkpoint/resume
//!
//! Both realizations share the same fold; the only difference is when the
//! verdict is taken.

pub mod checkpoint;
pub mod follow;

pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore, FileCheckpointStore};
pub use follow::FollowRunner;

use reconcile_core::{replay, EventSource, ReplayState, SourceError, Verdict};
use thiserror::Error;
use tracing::info;

/// Fatal runtime failures. Everything here aborts the run; recoverable
/// anomalies live inside the verdict instead.
#[derive(Debug, Error)]
pub enum RunError {
    /// The event source failed (unreadable log, malformed record).
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Checkpoint persistence failed.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// The stored checkpoint points past the end of the export: the log
    /// was truncated or rewritten, and the snapshot no longer describes it.
    #[error("checkpoint position {position} is beyond the export ({skipped} events present)")]
    CheckpointAhead {
        /// Position recorded in the checkpoint.
        position: u64,
        /// Events actually present in the export.
        skipped: u64,
    },
}

/// Batch validation: folds the entire source and evaluates the verdict.
///
/// # Errors
///
/// Propagates the first [`SourceError`]; the run aborts with no partial
/// verdict.
pub fn validate<S: EventSource>(source: S, initial: ReplayState) -> Result<Verdict, SourceError> {
    let state = replay(source, initial)?;
    let verdict = Verdict::evaluate(&state);
    info!(
        events = state.events_folded(),
        ledgers = state.ledgers().len(),
        duplicates = state.duplicate_event_ids().len(),
        invalid = state.invalid_events().len(),
        unmatched = state.unmatched_terminations(),
        ok = verdict.ok,
        "replay validation complete"
    );
    Ok(verdict)
}
