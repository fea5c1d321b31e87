// src/registry.rs

//! The Job Registry: `add-job` requests become descriptor files.
//!
//! Multiple `add-job` invocations may run in parallel; each one writes a
//! distinct `jobs/<job_id>.json`, so no cross-process lock is needed.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use crate::model::{CiStage, JobDescriptor};
use crate::store::{atomic, StoreRoot};

/// Everything the caller specifies about a job; the registry adds the
/// id and the derived status-file path.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub command: String,
    pub pipeline_name: String,
    pub ci_stage: CiStage,
    pub cwd: Option<PathBuf>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub timeout: Option<u64>,
    pub timeout_ok: bool,
    pub timeout_ignore: bool,
    pub interleave_stdout_stderr: bool,
    pub ignore_returns: Vec<i32>,
    pub ok_returns: Vec<i32>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub stdout_file: Option<PathBuf>,
    pub stderr_file: Option<PathBuf>,
}

impl NewJob {
    pub fn new(command: &str, pipeline_name: &str, ci_stage: CiStage) -> Self {
        Self {
            command: command.to_string(),
            pipeline_name: pipeline_name.to_string(),
            ci_stage,
            cwd: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            timeout: None,
            timeout_ok: false,
            timeout_ignore: false,
            interleave_stdout_stderr: false,
            ignore_returns: Vec::new(),
            ok_returns: Vec::new(),
            description: None,
            tags: Vec::new(),
            stdout_file: None,
            stderr_file: None,
        }
    }
}

/// Assign a fresh job id, persist the descriptor into the active run and
/// return it.
pub fn add_job(root: &StoreRoot, new_job: NewJob) -> Result<JobDescriptor> {
    let run_dir = root.current_run_dir()?;

    let job_id = Uuid::new_v4().to_string();
    let descriptor = JobDescriptor {
        status_file: run_dir.status_file(&job_id),
        job_id,
        command: new_job.command,
        pipeline_name: new_job.pipeline_name,
        ci_stage: new_job.ci_stage,
        cwd: new_job.cwd,
        inputs: new_job.inputs,
        outputs: new_job.outputs,
        timeout: new_job.timeout,
        timeout_ok: new_job.timeout_ok,
        timeout_ignore: new_job.timeout_ignore,
        interleave_stdout_stderr: new_job.interleave_stdout_stderr,
        ignore_returns: new_job.ignore_returns,
        ok_returns: new_job.ok_returns,
        description: new_job.description,
        tags: new_job.tags,
        stdout_file: new_job.stdout_file,
        stderr_file: new_job.stderr_file,
    };

    atomic::write_json_atomic(&run_dir.job_file(&descriptor.job_id), &descriptor)?;

    info!(
        job_id = %descriptor.job_id,
        pipeline = %descriptor.pipeline_name,
        ci_stage = %descriptor.ci_stage,
        command = %descriptor.command,
        "registered job"
    );
    Ok(descriptor)
}
