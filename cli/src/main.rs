//! Replay validation for the ticket-reservation saga's exported event log.
//!
//! Reads an append-only JSONL export, folds it through the reconciliation
//! engine, and prints the verdict as one JSON object on stdout.
//!
//! Exit codes: `0` when the verdict is ok, `1` when violations were found,
//! `2` on a fatal source or checkpoint error.

mod config;

use anyhow::Context;
use config::Config;
use reconcile_core::{ReplayState, Verdict};
use reconcile_jsonl::JsonlSource;
use reconcile_runtime::{validate, FileCheckpointStore, FollowRunner};
use std::process::ExitCode;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reconcile=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(input) = std::env::args().nth(1) else {
        eprintln!("usage: reconcile <events.jsonl>");
        return ExitCode::from(2);
    };

    let config = Config::from_env();
    info!(
        %input,
        policy = ?config.unmatched_policy,
        follow = config.follow,
        "starting replay validation"
    );

    match run(&input, &config).await {
        Ok(verdict) => match emit(&verdict) {
            Ok(()) if verdict.ok => ExitCode::SUCCESS,
            Ok(()) => ExitCode::from(1),
            Err(e) => {
                error!("failed to write verdict: {e:#}");
                ExitCode::from(2)
            }
        },
        Err(e) => {
            error!("replay validation aborted: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(input: &str, config: &Config) -> anyhow::Result<Verdict> {
    let source = JsonlSource::open(input)
        .with_context(|| format!("cannot open event log {input}"))?;
    let initial = ReplayState::with_policy(config.unmatched_policy);

    if config.follow {
        let checkpoint_store = FileCheckpointStore::new(&config.checkpoint_path);
        let shutdown = shutdown_signal();
        let runner = FollowRunner::resume(
            source,
            checkpoint_store,
            initial,
            config.poll_interval,
            shutdown,
        )
        .context("cannot resume from checkpoint")?
        .with_checkpoint_interval(config.checkpoint_every);
        Ok(runner.run().await?)
    } else {
        Ok(validate(source, initial)?)
    }
}

/// Verdict goes to stdout; logs go to stderr, so the output stays pipeable.
fn emit(verdict: &Verdict) -> anyhow::Result<()> {
    let doc = serde_json::to_string(verdict).context("verdict serialization")?;
    println!("{doc}");
    Ok(())
}

/// Flips a watch channel on Ctrl-C / SIGTERM; the runner checks it between
/// event reads.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        let ctrl_c = signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut term = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(term) => term,
                Err(e) => {
                    error!("cannot install SIGTERM handler: {e}");
                    let _ = ctrl_c.await;
                    let _ = tx.send(true);
                    return;
                }
            };
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        info!("shutdown signal received");
        let _ = tx.send(true);
    });
    rx
}
