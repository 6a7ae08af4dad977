//! Continuous replay over a growing export.
//!
//! [`FollowRunner`] tails an append-only source: it folds events as they
//! appear, sleeps briefly when caught up, checks a shutdown signal between
//! reads (cooperative cancellation, so no event is ever half-applied), and
//! checkpoints position + state snapshot every N events so a restart
//! resumes without re-counting already-folded quantities.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::RunError;
use reconcile_core::{EventSource, ReplayState, Verdict};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Default number of events folded between checkpoint saves.
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 100;

/// Continuous replay driver.
///
/// Shutdown is a `watch` channel flipped by the process's signal handler.
/// On shutdown the runner saves a final checkpoint and returns the verdict
/// for everything folded so far.
pub struct FollowRunner<S, C> {
    source: S,
    checkpoint_store: C,
    state: ReplayState,
    poll_interval: Duration,
    checkpoint_interval: u64,
    shutdown: watch::Receiver<bool>,
}

impl<S, C> FollowRunner<S, C>
where
    S: EventSource,
    C: CheckpointStore,
{
    /// Builds a runner, resuming from the stored checkpoint when one
    /// exists.
    ///
    /// Resume works by restoring the snapshot and then skipping exactly
    /// `position` envelopes from the front of the re-opened source (the
    /// source itself is forward-only, so the log is re-read but not
    /// re-folded). The skipped prefix is not re-validated; the export is
    /// append-only by contract.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when the checkpoint cannot be loaded or the
    /// source fails while skipping the already-folded prefix.
    pub fn resume(
        mut source: S,
        checkpoint_store: C,
        initial: ReplayState,
        poll_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, RunError> {
        let state = match checkpoint_store.load()? {
            Some(Checkpoint { position, state, .. }) => {
                info!(position, "resuming from checkpoint");
                let mut skipped = 0;
                while skipped < position {
                    if source.next_event()?.is_none() {
                        // The export shrank below the checkpointed position;
                        // the log was rewritten, so the snapshot is useless.
                        warn!(
                            position,
                            skipped, "export shorter than checkpoint; cannot resume"
                        );
                        return Err(RunError::CheckpointAhead { position, skipped });
                    }
                    skipped += 1;
                }
                state
            }
            None => initial,
        };

        Ok(Self {
            source,
            checkpoint_store,
            state,
            poll_interval,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            shutdown,
        })
    }

    /// Overrides how many folded events elapse between checkpoint saves.
    #[must_use]
    pub fn with_checkpoint_interval(mut self, every: u64) -> Self {
        self.checkpoint_interval = every.max(1);
        self
    }

    /// Runs until shutdown is signalled, then returns the verdict over
    /// everything folded.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] on a fatal source failure or when a checkpoint
    /// cannot be saved (continuing without durable progress would make the
    /// next resume double-fold).
    pub async fn run(mut self) -> Result<Verdict, RunError> {
        let mut since_checkpoint = 0_u64;

        loop {
            if *self.shutdown.borrow() {
                info!("shutdown signalled; finishing follow run");
                break;
            }

            match self.source.next_event()? {
                Some(envelope) => {
                    self.state.apply(&envelope);
                    since_checkpoint += 1;
                    if since_checkpoint >= self.checkpoint_interval {
                        self.checkpoint_store.save(&Checkpoint::capture(&self.state))?;
                        since_checkpoint = 0;
                    }
                }
                None => {
                    // Caught up; persist progress, then wait for growth or
                    // shutdown, whichever comes first.
                    if since_checkpoint > 0 {
                        self.checkpoint_store.save(&Checkpoint::capture(&self.state))?;
                        since_checkpoint = 0;
                    }
                    tokio::select! {
                        () = tokio::time::sleep(self.poll_interval) => {}
                        _ = self.shutdown.changed() => {}
                    }
                }
            }
        }

        self.checkpoint_store.save(&Checkpoint::capture(&self.state))?;

        let verdict = Verdict::evaluate(&self.state);
        info!(
            events = self.state.events_folded(),
            ledgers = self.state.ledgers().len(),
            unmatched = self.state.unmatched_terminations(),
            ok = verdict.ok,
            "follow run complete"
        );
        Ok(verdict)
    }
}
