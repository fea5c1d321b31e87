#![allow(dead_code)]

use std::path::PathBuf;

use litani::model::{CiStage, JobDescriptor, JobStatus};
use litani::registry::NewJob;

/// Builder for job registrations (and, via [`JobBuilder::into_descriptor`],
/// for standalone descriptors) to simplify test setup.
pub struct JobBuilder {
    job: NewJob,
}

impl JobBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            job: NewJob::new(command, "p", CiStage::Build),
        }
    }

    pub fn pipeline(mut self, name: &str) -> Self {
        self.job.pipeline_name = name.to_string();
        self
    }

    pub fn ci_stage(mut self, stage: CiStage) -> Self {
        self.job.ci_stage = stage;
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.job.cwd = Some(dir.into());
        self
    }

    pub fn input(mut self, path: &str) -> Self {
        self.job.inputs.push(path.to_string());
        self
    }

    pub fn output(mut self, path: &str) -> Self {
        self.job.outputs.push(path.to_string());
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.job.timeout = Some(secs);
        self
    }

    pub fn timeout_ok(mut self) -> Self {
        self.job.timeout_ok = true;
        self
    }

    pub fn timeout_ignore(mut self) -> Self {
        self.job.timeout_ignore = true;
        self
    }

    pub fn interleave(mut self) -> Self {
        self.job.interleave_stdout_stderr = true;
        self
    }

    pub fn ignore_return(mut self, code: i32) -> Self {
        self.job.ignore_returns.push(code);
        self
    }

    pub fn ok_return(mut self, code: i32) -> Self {
        self.job.ok_returns.push(code);
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.job.description = Some(text.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.job.tags.push(tag.to_string());
        self
    }

    pub fn stdout_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.job.stdout_file = Some(path.into());
        self
    }

    pub fn stderr_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.job.stderr_file = Some(path.into());
        self
    }

    pub fn build(self) -> NewJob {
        self.job
    }

    /// Turn the builder into a standalone descriptor without touching a
    /// run store; for tests of pure assembly/emission logic.
    pub fn into_descriptor(self, job_id: &str, status_file: impl Into<PathBuf>) -> JobDescriptor {
        let job = self.job;
        JobDescriptor {
            job_id: job_id.to_string(),
            command: job.command,
            pipeline_name: job.pipeline_name,
            ci_stage: job.ci_stage,
            cwd: job.cwd,
            inputs: job.inputs,
            outputs: job.outputs,
            timeout: job.timeout,
            timeout_ok: job.timeout_ok,
            timeout_ignore: job.timeout_ignore,
            interleave_stdout_stderr: job.interleave_stdout_stderr,
            ignore_returns: job.ignore_returns,
            ok_returns: job.ok_returns,
            description: job.description,
            tags: job.tags,
            stdout_file: job.stdout_file,
            stderr_file: job.stderr_file,
            status_file: status_file.into(),
        }
    }
}

/// A finalized status for the given descriptor, for tests that exercise
/// classification without running a process.
pub fn finished_status(
    descriptor: &JobDescriptor,
    command_return_code: i32,
    wrapper_return_code: i32,
    timeout_reached: bool,
) -> JobStatus {
    let mut status = JobStatus::started(descriptor, "2026-01-01T00:00:00Z".to_string());
    status.complete = true;
    status.end_time = Some("2026-01-01T00:00:05Z".to_string());
    status.duration = Some(5);
    status.timeout_reached = timeout_reached;
    status.command_return_code = Some(command_return_code);
    status.wrapper_return_code = wrapper_return_code;
    status
}
