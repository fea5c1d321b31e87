// src/model/job.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// CI stage a job belongs to. Closed set; the order here is the order
/// stages appear in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiStage {
    Build,
    Test,
    Report,
}

impl CiStage {
    pub const ALL: [CiStage; 3] = [CiStage::Build, CiStage::Test, CiStage::Report];

    pub fn as_str(&self) -> &'static str {
        match self {
            CiStage::Build => "build",
            CiStage::Test => "test",
            CiStage::Report => "report",
        }
    }
}

impl fmt::Display for CiStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CiStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "build" => Ok(CiStage::Build),
            "test" => Ok(CiStage::Test),
            "report" => Ok(CiStage::Report),
            other => Err(format!(
                "invalid ci stage: {other} (expected \"build\", \"test\" or \"report\")"
            )),
        }
    }
}

/// Immutable record of how to run one command, produced by `add-job`.
///
/// The shape is closed: a descriptor file with unknown fields fails to
/// parse rather than being silently accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobDescriptor {
    /// Unique within a run.
    pub job_id: String,

    /// Shell command, run through the platform shell.
    pub command: String,

    pub pipeline_name: String,
    pub ci_stage: CiStage,

    /// Working directory for the command; the invoking directory if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Paths the job depends on. Order is irrelevant for correctness.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Paths the job produces.
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Wall-clock limit in seconds; no limit if unset. The timeout flags
    /// below are no-ops without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub timeout_ok: bool,

    #[serde(default)]
    pub timeout_ignore: bool,

    #[serde(default)]
    pub interleave_stdout_stderr: bool,

    /// Return codes treated as success in addition to 0.
    #[serde(default)]
    pub ignore_returns: Vec<i32>,

    /// Return codes that let the job continue but fail the run at the end.
    #[serde(default)]
    pub ok_returns: Vec<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Redirect target for the raw captured stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_file: Option<PathBuf>,

    /// Redirect target for the raw captured stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_file: Option<PathBuf>,

    /// Derived: `<run>/status/<job_id>.json`.
    pub status_file: PathBuf,
}

impl JobDescriptor {
    /// Whether a command return code counts as success for this job.
    /// 0 is always implicitly ignored.
    pub fn return_code_ignored(&self, code: i32) -> bool {
        code == 0 || self.ignore_returns.contains(&code)
    }
}

/// Mutable execution record for one job; lives at the descriptor's
/// `status_file` and is the single source of truth for the job's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobStatus {
    pub job_id: String,

    /// `false` while the job runs; never transitions back once `true`.
    pub complete: bool,

    pub start_time: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    /// Whole seconds between start and end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    #[serde(default)]
    pub timeout_reached: bool,

    /// Exit code of the supervised process; `-1` stands in for abnormal
    /// termination (signal kill, spawn failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_return_code: Option<i32>,

    /// Exit code of the wrapper itself: 0 or 1.
    #[serde(default)]
    pub wrapper_return_code: i32,

    #[serde(default)]
    pub stdout: Vec<String>,

    #[serde(default)]
    pub stderr: Vec<String>,

    /// Copy of the descriptor this execution ran under.
    pub wrapper_arguments: JobDescriptor,
}

impl JobStatus {
    /// Status written before the subprocess is spawned.
    pub fn started(descriptor: &JobDescriptor, start_time: String) -> Self {
        Self {
            job_id: descriptor.job_id.clone(),
            complete: false,
            start_time,
            end_time: None,
            duration: None,
            timeout_reached: false,
            command_return_code: None,
            wrapper_return_code: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
            wrapper_arguments: descriptor.clone(),
        }
    }

    /// Whether this status makes the whole run fail at the end: either
    /// the wrapper reported failure, or a timeout was consumed under
    /// `timeout_ignore` (which keeps the wrapper code at 0 by design of
    /// the flag, yet still fails the run).
    pub fn fails_run(&self) -> bool {
        self.wrapper_return_code != 0
            || (self.timeout_reached && self.wrapper_arguments.timeout_ignore)
    }
}
