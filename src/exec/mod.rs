// src/exec/mod.rs

//! The Execution Wrapper (`exec`): launch exactly one subprocess,
//! observe it to completion and atomically publish its status file.
//!
//! Subprocess trouble (spawn failure, nonzero exit, timeout) is never
//! raised to the caller; it is captured in the status file, which is the
//! single source of truth for the job's outcome. The wrapper's own exit
//! code is the classified result.

pub mod artifacts;

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

use crate::errors::LitaniError;
use crate::model::{format_timestamp, JobDescriptor, JobStatus};
use crate::store::{atomic, RunDir};

type LineSink = Arc<Mutex<Vec<String>>>;

/// Entry point for the `exec` subcommand. Returns the wrapper return
/// code; an `Err` only means the descriptor itself was unreadable or the
/// artifact tree could not be written.
pub async fn run(descriptor_path: &Path) -> Result<i32> {
    let descriptor = load_descriptor(descriptor_path)?;
    let run_dir = RunDir::containing_status_file(&descriptor.status_file)?;

    let wrapper_rc = run_job(&descriptor).await;
    artifacts::collect(&descriptor, &run_dir)?;

    Ok(wrapper_rc)
}

fn load_descriptor(path: &Path) -> Result<JobDescriptor> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_| LitaniError::DescriptorRead(path.to_path_buf()))?;
    let descriptor = serde_json::from_str(&contents)
        .map_err(|_| LitaniError::DescriptorRead(path.to_path_buf()))?;
    Ok(descriptor)
}

/// Supervise one job: initial status, spawn, (bounded) wait, capture,
/// classification, final status. Infallible by design.
async fn run_job(descriptor: &JobDescriptor) -> i32 {
    let start = Utc::now();
    let mut status = JobStatus::started(descriptor, format_timestamp(start));
    if let Err(err) = atomic::write_json_atomic(&descriptor.status_file, &status) {
        warn!(
            job_id = %descriptor.job_id,
            error = %err,
            "could not write initial status; continuing"
        );
    }

    info!(
        job_id = %descriptor.job_id,
        pipeline = %descriptor.pipeline_name,
        cmd = %descriptor.command,
        "starting job process"
    );

    let (timeout_reached, command_rc, stdout_lines, stderr_lines) = match spawn_shell(descriptor) {
        Ok(child) => supervise(descriptor, child).await,
        Err(err) => {
            // Synthetic failure record; the wrapper never raises here.
            error!(job_id = %descriptor.job_id, error = %err, "failed to spawn job command");
            (false, -1, Vec::new(), Vec::new())
        }
    };

    let wrapper_rc = if timeout_reached {
        if descriptor.timeout_ok || descriptor.timeout_ignore {
            0
        } else {
            1
        }
    } else if descriptor.return_code_ignored(command_rc) {
        0
    } else {
        1
    };

    let end = Utc::now();
    status.complete = true;
    status.end_time = Some(format_timestamp(end));
    status.duration = Some((end - start).num_seconds().max(0) as u64);
    status.timeout_reached = timeout_reached;
    status.command_return_code = Some(command_rc);
    status.wrapper_return_code = wrapper_rc;
    status.stdout = stdout_lines;
    status.stderr = stderr_lines;

    if let Some(path) = &descriptor.stdout_file {
        write_raw_capture(path, &status.stdout, &descriptor.job_id);
    }
    if let Some(path) = &descriptor.stderr_file {
        write_raw_capture(path, &status.stderr, &descriptor.job_id);
    }

    if let Err(err) = atomic::write_json_atomic(&descriptor.status_file, &status) {
        error!(job_id = %descriptor.job_id, error = %err, "could not write final status");
    }

    info!(
        job_id = %descriptor.job_id,
        command_return_code = command_rc,
        wrapper_return_code = wrapper_rc,
        timeout_reached,
        "job process finished"
    );

    wrapper_rc
}

/// Build a shell command appropriate for the platform.
fn spawn_shell(descriptor: &JobDescriptor) -> Result<Child> {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&descriptor.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&descriptor.command);
        c
    };

    if let Some(dir) = &descriptor.cwd {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    cmd.spawn()
        .with_context(|| format!("spawning process for job '{}'", descriptor.job_id))
}

/// Wait for the child with an optional wall-clock timeout, draining both
/// streams into line buffers. Returns
/// `(timeout_reached, command_return_code, stdout, stderr)`.
async fn supervise(
    descriptor: &JobDescriptor,
    mut child: Child,
) -> (bool, i32, Vec<String>, Vec<String>) {
    let stdout_sink: LineSink = Arc::new(Mutex::new(Vec::new()));
    // Merged capture shares the stdout sink; interleaving is
    // line-granular.
    let stderr_sink: LineSink = if descriptor.interleave_stdout_stderr {
        stdout_sink.clone()
    } else {
        Arc::new(Mutex::new(Vec::new()))
    };

    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(collect_lines(stdout, stdout_sink.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(collect_lines(stderr, stderr_sink.clone())));
    }

    let (timeout_reached, command_rc) = match descriptor.timeout {
        Some(secs) => {
            match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
                Ok(wait_result) => (false, exit_code_of(wait_result, descriptor)),
                Err(_elapsed) => {
                    warn!(
                        job_id = %descriptor.job_id,
                        timeout = secs,
                        "job exceeded its timeout; killing process"
                    );
                    if let Err(err) = child.start_kill() {
                        warn!(job_id = %descriptor.job_id, error = %err, "failed to kill job process");
                    }
                    // Reap before finalizing so no zombie outlives the wrapper.
                    (true, exit_code_of(child.wait().await, descriptor))
                }
            }
        }
        None => (false, exit_code_of(child.wait().await, descriptor)),
    };

    // The pipes hit EOF once the child is gone; drain what was captured.
    for reader in readers {
        let _ = reader.await;
    }

    let stdout_lines = take_lines(&stdout_sink);
    let stderr_lines = if descriptor.interleave_stdout_stderr {
        Vec::new()
    } else {
        take_lines(&stderr_sink)
    };

    (timeout_reached, command_rc, stdout_lines, stderr_lines)
}

fn exit_code_of(result: std::io::Result<std::process::ExitStatus>, descriptor: &JobDescriptor) -> i32 {
    match result {
        Ok(exit) => exit.code().unwrap_or(-1),
        Err(err) => {
            warn!(job_id = %descriptor.job_id, error = %err, "waiting for job process failed");
            -1
        }
    }
}

async fn collect_lines<R>(stream: R, sink: LineSink)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Ok(mut sink) = sink.lock() {
            sink.push(line);
        }
    }
}

fn take_lines(sink: &LineSink) -> Vec<String> {
    match sink.lock() {
        Ok(mut lines) => std::mem::take(&mut *lines),
        Err(_) => Vec::new(),
    }
}

/// Best-effort raw stream redirect; failures are logged, the status file
/// already holds the captured lines.
fn write_raw_capture(path: &Path, lines: &[String], job_id: &str) {
    let mut raw = lines.join("\n");
    if !raw.is_empty() {
        raw.push('\n');
    }
    if let Err(err) = atomic::write_atomic(path, raw.as_bytes()) {
        warn!(job_id = %job_id, path = ?path, error = %err, "could not write capture redirect");
    } else {
        debug!(job_id = %job_id, path = ?path, "wrote capture redirect");
    }
}
