// src/runbuild.rs

//! The Run Coordinator (`run-build`): merge the registered descriptors
//! into the run cache, emit the build graph, spawn the external DAG
//! executor alongside the reporter loop, and finalize the run from the
//! status files once the executor exits.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::model::{utc_now_string, CiStage, JobStatus, RunStatus};
use crate::ninja;
use crate::report::{self, ReporterOptions};
use crate::store::StoreRoot;

#[derive(Debug, Clone)]
pub struct RunBuildOptions {
    /// Executor parallelism; `Some(0)` means unbounded, `None` leaves the
    /// executor's own default.
    pub parallel: Option<u64>,
    pub dry_run: bool,
    /// Build only these pipelines' aggregates. Mutually exclusive with
    /// `ci_stage` (enforced at parse time).
    pub pipelines: Vec<String>,
    pub ci_stage: Option<CiStage>,
    pub fail_on_pipeline_failure: bool,
    pub out_file: Option<PathBuf>,
    pub render: Option<String>,
    pub interval_secs: u64,
    pub ninja_program: PathBuf,
}

impl Default for RunBuildOptions {
    fn default() -> Self {
        Self {
            parallel: None,
            dry_run: false,
            pipelines: Vec::new(),
            ci_stage: None,
            fail_on_pipeline_failure: false,
            out_file: None,
            render: None,
            interval_secs: 2,
            ninja_program: PathBuf::from("ninja"),
        }
    }
}

/// Drive a full build of the current run. Returns the process exit code.
pub async fn run_build(root: &StoreRoot, options: RunBuildOptions) -> Result<i32> {
    let run_dir = root.current_run_dir()?;

    // Single-writer discipline: only the coordinator touches cache.json.
    let mut run = run_dir.load_cache()?;
    run.jobs = run_dir.load_descriptors()?;
    run_dir.store_cache(&run)?;
    info!(run_id = %run.run_id, jobs = run.jobs.len(), "materializing build graph");

    let exec_program = std::env::current_exe().context("resolving the litani binary path")?;
    ninja::emit(&run_dir, &run.jobs, &exec_program)?;

    let reporter_options = ReporterOptions {
        interval: Duration::from_secs(options.interval_secs),
        out_file: options.out_file.clone(),
        render: options.render.clone(),
    };

    // Initial snapshot before anything runs, then the loop takes over.
    if let Err(err) = report::publish_snapshot(&run_dir, &reporter_options).await {
        warn!(error = %err, "initial snapshot failed");
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let reporter = tokio::spawn(report::reporter_loop(
        run_dir.clone(),
        reporter_options.clone(),
        stop_rx,
    ));

    let executor_status = spawn_executor(&run_dir.ninja_file(), &options).await;

    // Finalize the run from the status files, whatever the executor said.
    run.end_time = Some(utc_now_string());
    let statuses = run_dir.load_statuses()?;
    run.status = compute_final_status(&statuses);
    run_dir.store_cache(&run)?;

    let _ = stop_tx.send(true);
    let _ = reporter.await;

    if let Err(err) = report::publish_snapshot(&run_dir, &reporter_options).await {
        warn!(error = %err, "final snapshot failed");
    }

    let executor_status = executor_status?;
    info!(
        run_id = %run.run_id,
        status = ?run.status,
        executor_success = executor_status.success(),
        "run finished"
    );

    if options.fail_on_pipeline_failure && !executor_status.success() {
        Ok(1)
    } else {
        Ok(0)
    }
}

/// Spawn the external DAG executor: keep going past failures, bounded
/// parallelism, optional dry run, optional target selection via the
/// phony aggregates.
async fn spawn_executor(
    ninja_file: &std::path::Path,
    options: &RunBuildOptions,
) -> Result<std::process::ExitStatus> {
    let mut cmd = Command::new(&options.ninja_program);
    cmd.arg("-k").arg("0").arg("-f").arg(ninja_file);

    if let Some(parallel) = options.parallel {
        // ninja treats -j 0 as unbounded, matching our contract.
        cmd.arg("-j").arg(parallel.to_string());
    }
    if options.dry_run {
        cmd.arg("-n");
    }
    for pipeline in &options.pipelines {
        cmd.arg(ninja::pipeline_target(pipeline));
    }
    if let Some(stage) = options.ci_stage {
        cmd.arg(ninja::stage_target(stage));
    }

    info!(executor = ?options.ninja_program, "spawning DAG executor");
    cmd.status()
        .await
        .with_context(|| format!("spawning DAG executor {:?}", options.ninja_program))
}

/// The run succeeds iff every status file reports a zero wrapper return
/// code and no job consumed its timeout under `timeout_ignore`.
pub fn compute_final_status(statuses: &HashMap<String, JobStatus>) -> RunStatus {
    if statuses.values().any(JobStatus::fails_run) {
        RunStatus::Fail
    } else {
        RunStatus::Success
    }
}
