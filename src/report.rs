// src/report.rs

//! The Reporter Loop: a background task that periodically merges the run
//! cache with every status file, publishes the snapshot atomically, and
//! invokes the external renderer. A reporter failure is logged and
//! retried on the next tick; it never kills the run.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::model::RunSnapshot;
use crate::ninja::quote_sh;
use crate::store::{atomic, RunDir};

#[derive(Debug, Clone)]
pub struct ReporterOptions {
    pub interval: Duration,
    /// Extra copy of each snapshot, if requested.
    pub out_file: Option<PathBuf>,
    /// External renderer command; the snapshot path is appended.
    pub render: Option<String>,
}

/// Run until the stop signal flips. The loop reacts to the signal at its
/// next check, so stop latency is bounded by the tick interval.
pub async fn reporter_loop(
    run_dir: RunDir,
    options: ReporterOptions,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(interval = ?options.interval, "reporter loop started");
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                // Either an explicit stop or the coordinator went away.
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if let Err(err) = publish_snapshot(&run_dir, &options).await {
                    warn!(error = %err, "snapshot publication failed; retrying next tick");
                }
            }
        }
    }
    debug!("reporter loop stopped");
}

/// One reporter tick: rebuild, publish, render.
///
/// The store reads and the atomic rewrites are plain blocking fs calls,
/// so they run on a blocking worker; the loop must never stall the
/// runtime threads the executor's stream readers share.
pub async fn publish_snapshot(run_dir: &RunDir, options: &ReporterOptions) -> Result<()> {
    let store = run_dir.clone();
    let out_file = options.out_file.clone();

    let run_id = tokio::task::spawn_blocking(move || -> Result<String> {
        let run = store.load_cache()?;
        let statuses = store.load_statuses()?;
        let snapshot = RunSnapshot::assemble(&run, &statuses);

        store.write_snapshot(&snapshot)?;
        if let Some(out_file) = &out_file {
            atomic::write_json_atomic(out_file, &snapshot)?;
        }
        Ok(snapshot.run_id)
    })
    .await
    .context("joining the snapshot worker")??;

    if let Some(render) = &options.render {
        render_snapshot(render, run_dir).await?;
    }

    debug!(run_id = %run_id, "published snapshot");
    Ok(())
}

/// Invoke the external renderer through the shell with the snapshot path
/// appended. A nonzero renderer exit is a warning, not an error.
async fn render_snapshot(render: &str, run_dir: &RunDir) -> Result<()> {
    let command = format!(
        "{render} {}",
        quote_sh(&run_dir.run_json().display().to_string())
    );

    let mut cmd = if cfg!(windows) {
        let mut c = tokio::process::Command::new("cmd");
        c.arg("/C").arg(&command);
        c
    } else {
        let mut c = tokio::process::Command::new("sh");
        c.arg("-c").arg(&command);
        c
    };

    let status = cmd
        .status()
        .await
        .with_context(|| format!("spawning renderer '{render}'"))?;
    if !status.success() {
        warn!(renderer = %render, code = status.code(), "renderer exited nonzero");
    }
    Ok(())
}
