//! Configuration for the `reconcile` command.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The only positional input is the export path; everything else is an
//! operational knob.

use reconcile_core::UnmatchedHoldPolicy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration loaded from `RECONCILE_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// How to resolve releases/confirms with no matching open hold
    /// (`RECONCILE_UNMATCHED_POLICY`: `fallback` | `strict`).
    pub unmatched_policy: UnmatchedHoldPolicy,
    /// Tail the export continuously instead of one batch pass
    /// (`RECONCILE_FOLLOW`: `true` | `false`).
    pub follow: bool,
    /// Checkpoint document path for follow mode
    /// (`RECONCILE_CHECKPOINT`, default `reconcile-checkpoint.json`).
    pub checkpoint_path: PathBuf,
    /// Poll interval when caught up in follow mode
    /// (`RECONCILE_POLL_INTERVAL_MS`, default 1000).
    pub poll_interval: Duration,
    /// Events folded between checkpoint saves
    /// (`RECONCILE_CHECKPOINT_EVERY`, default 100).
    pub checkpoint_every: u64,
}

impl Config {
    /// Loads configuration from the environment, falling back to defaults
    /// for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            unmatched_policy: match env::var("RECONCILE_UNMATCHED_POLICY").as_deref() {
                Ok("strict") => UnmatchedHoldPolicy::StrictRegistryOnly,
                _ => UnmatchedHoldPolicy::FallbackToEventQty,
            },
            follow: env::var("RECONCILE_FOLLOW")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            checkpoint_path: env::var("RECONCILE_CHECKPOINT")
                .map_or_else(|_| PathBuf::from("reconcile-checkpoint.json"), PathBuf::from),
            poll_interval: Duration::from_millis(
                env::var("RECONCILE_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1000),
            ),
            checkpoint_every: env::var("RECONCILE_CHECKPOINT_EVERY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        }
    }
}
