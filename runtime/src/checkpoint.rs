//! Checkpoint persistence for the continuous runner.
//!
//! A checkpoint pairs the last-processed stream position with a full
//! [`ReplayState`] snapshot in one document, saved atomically. The pairing
//! is load-bearing: the dedup guard only *reports* duplicates, it does not
//! suppress them, so resuming from a bare position against a fresh state
//! (or from a stale state against a bare position) would double-count
//! quantities. There is deliberately no position-only resume mode.

use chrono::{DateTime, Utc};
use reconcile_core::ReplayState;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from checkpoint persistence.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The checkpoint file could not be read or written.
    #[error("checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The checkpoint document could not be encoded or decoded.
    #[error("checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Position + state snapshot, persisted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Number of envelopes folded so far; the resume point skips exactly
    /// this many events from the front of the re-opened source.
    pub position: u64,
    /// When the checkpoint was written.
    pub saved_at: DateTime<Utc>,
    /// Full accumulator snapshot at `position`.
    pub state: ReplayState,
}

impl Checkpoint {
    /// Captures the current state as a checkpoint. The position comes from
    /// the state's own fold counter, so the pair cannot drift apart.
    #[must_use]
    pub fn capture(state: &ReplayState) -> Self {
        Self {
            position: state.events_folded(),
            saved_at: Utc::now(),
            state: state.clone(),
        }
    }
}

/// Storage seam for checkpoints.
pub trait CheckpointStore {
    /// Loads the latest checkpoint, `Ok(None)` when none was ever saved.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] when the store is unreadable or the
    /// document does not decode.
    fn load(&self) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Persists a checkpoint, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] when the document cannot be written.
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    /// Discards any saved checkpoint, forcing the next run to start from
    /// the beginning of the log.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] when the store cannot be cleared.
    fn reset(&self) -> Result<(), CheckpointError>;
}

/// File-backed checkpoint store: one JSON document, replaced atomically
/// via a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store writing to the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The checkpoint document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let doc = match fs::read_to_string(&self.path) {
            Ok(doc) => doc,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let checkpoint: Checkpoint = serde_json::from_str(&doc)?;
        debug!(
            position = checkpoint.position,
            saved_at = %checkpoint.saved_at,
            "loaded checkpoint"
        );
        Ok(Some(checkpoint))
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let doc = serde_json::to_vec(checkpoint)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, doc)?;
        fs::rename(&tmp, &self.path)?;
        debug!(position = checkpoint.position, "saved checkpoint");
        Ok(())
    }

    fn reset(&self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reconcile_core::envelope::EventEnvelope;
    use serde_json::json;

    fn state_with_events(n: u64) -> ReplayState {
        let mut state = ReplayState::default();
        for i in 0..n {
            state.apply(&EventEnvelope {
                event_id: format!("E{i}"),
                event_type: "hold_created".to_string(),
                aggregate_id: String::new(),
                payload: json!({"partition_key": "K", "hold_id": format!("H{i}"), "qty": 1, "capacity": 100}),
            });
        }
        state
    }

    #[test]
    fn load_of_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("ckpt.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("ckpt.json"));

        let state = state_with_events(3);
        store.save(&Checkpoint::capture(&state)).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.position, 3);
        assert_eq!(loaded.state.events_folded(), 3);
        assert_eq!(loaded.state.ledgers()["K"].held_total(), 3);
    }

    #[test]
    fn save_replaces_previous_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("ckpt.json"));

        store.save(&Checkpoint::capture(&state_with_events(1))).unwrap();
        store.save(&Checkpoint::capture(&state_with_events(5))).unwrap();

        assert_eq!(store.load().unwrap().unwrap().position, 5);
    }

    #[test]
    fn reset_discards_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("ckpt.json"));

        store.save(&Checkpoint::capture(&state_with_events(1))).unwrap();
        store.reset().unwrap();
        assert!(store.load().unwrap().is_none());

        // Resetting an already-empty store is not an error.
        store.reset().unwrap();
    }
}
