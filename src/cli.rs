// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Four subcommands drive the run lifecycle: `init` creates a run,
//! repeated `add-job` invocations register jobs into it, `run-build`
//! materializes and executes the graph, and `exec` is the per-job
//! supervision wrapper that the external executor re-invokes.

use std::path::PathBuf;

use clap::{builder::PossibleValue, Args, Parser, Subcommand};

use crate::errors::LitaniError;
use crate::model::CiStage;
use crate::registry::NewJob;

/// Command-line arguments for `litani`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "litani",
    version,
    about = "Assemble a dependency graph of shell jobs across invocations, then run it.",
    long_about = None
)]
pub struct CliArgs {
    /// Emit debug-level diagnostics.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Emit trace-level diagnostics.
    #[arg(short = 'w', long = "very-verbose", global = true)]
    pub very_verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create a new run and point the cache at it.
    Init(InitArgs),

    /// Register a single job into the current run.
    AddJob(AddJobArgs),

    /// Materialize the build graph and execute the current run.
    RunBuild(RunBuildArgs),

    /// Run one job under supervision (invoked per job by the executor).
    Exec(ExecArgs),
}

#[derive(Debug, Clone, Args)]
pub struct InitArgs {
    /// Name of the project this run belongs to.
    #[arg(long, value_name = "NAME")]
    pub project_name: String,
}

#[derive(Debug, Clone, Args)]
pub struct AddJobArgs {
    /// Shell command to run. Alternatively, pass the command as the
    /// tokens following `--`.
    #[arg(long, value_name = "CMD")]
    pub command: Option<String>,

    /// Pipeline this job belongs to.
    #[arg(long, value_name = "NAME")]
    pub pipeline_name: String,

    /// CI stage this job belongs to (build, test, report).
    #[arg(long, value_name = "STAGE")]
    pub ci_stage: CiStage,

    /// Working directory for the job command.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Paths the job depends on.
    #[arg(long, num_args = 1.., value_name = "PATH")]
    pub inputs: Vec<String>,

    /// Paths the job produces.
    #[arg(long, num_args = 1.., value_name = "PATH")]
    pub outputs: Vec<String>,

    /// Wall-clock timeout in seconds.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Treat a timeout as success.
    #[arg(long)]
    pub timeout_ok: bool,

    /// Let the job pass on timeout, but fail the run at the end.
    #[arg(long)]
    pub timeout_ignore: bool,

    /// Merge stderr into the captured stdout stream.
    #[arg(long)]
    pub interleave_stdout_stderr: bool,

    /// Return codes (besides 0) that count as success.
    #[arg(long, num_args = 1.., value_name = "RC")]
    pub ignore_returns: Vec<i32>,

    /// Return codes that let the job continue but fail the run.
    #[arg(long, num_args = 1.., value_name = "RC")]
    pub ok_returns: Vec<i32>,

    /// Human-readable description of the job.
    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Free-form tags attached to the job.
    #[arg(long, num_args = 1.., value_name = "TAG")]
    pub tags: Vec<String>,

    /// Also write the raw captured stdout to this path.
    #[arg(long, value_name = "PATH")]
    pub stdout_file: Option<PathBuf>,

    /// Also write the raw captured stderr to this path.
    #[arg(long, value_name = "PATH")]
    pub stderr_file: Option<PathBuf>,

    /// Job command given as trailing tokens after `--`; these are not
    /// parsed as flags.
    #[arg(last = true, value_name = "COMMAND")]
    pub trailing: Vec<String>,
}

impl AddJobArgs {
    /// Resolve the job command (flag form vs. trailing form) and build
    /// the registry request. Exactly one command source must be given.
    pub fn into_new_job(self) -> Result<NewJob, LitaniError> {
        let command = match (self.command, self.trailing.is_empty()) {
            (Some(cmd), true) => cmd,
            (None, false) => self.trailing.join(" "),
            (Some(_), false) => {
                return Err(LitaniError::Config(
                    "pass the job command either via --command or after --, not both".into(),
                ))
            }
            (None, true) => {
                return Err(LitaniError::Config(
                    "no job command given; use --command or pass it after --".into(),
                ))
            }
        };

        Ok(NewJob {
            command,
            pipeline_name: self.pipeline_name,
            ci_stage: self.ci_stage,
            cwd: self.cwd,
            inputs: self.inputs,
            outputs: self.outputs,
            timeout: self.timeout,
            timeout_ok: self.timeout_ok,
            timeout_ignore: self.timeout_ignore,
            interleave_stdout_stderr: self.interleave_stdout_stderr,
            ignore_returns: self.ignore_returns,
            ok_returns: self.ok_returns,
            description: self.description,
            tags: self.tags,
            stdout_file: self.stdout_file,
            stderr_file: self.stderr_file,
        })
    }
}

#[derive(Debug, Clone, Args)]
pub struct RunBuildArgs {
    /// Maximum number of jobs the executor runs in parallel (0 = unbounded).
    #[arg(short = 'j', long, value_name = "N")]
    pub parallel: Option<u64>,

    /// Ask the executor to pretend every job succeeds.
    #[arg(long)]
    pub dry_run: bool,

    /// Only build the aggregates of these pipelines.
    #[arg(long, num_args = 1.., value_name = "NAME", conflicts_with = "ci_stage")]
    pub pipelines: Vec<String>,

    /// Only build the aggregate of this CI stage.
    #[arg(long, value_name = "STAGE")]
    pub ci_stage: Option<CiStage>,

    /// Exit non-zero when the executor reports a failure.
    #[arg(long)]
    pub fail_on_pipeline_failure: bool,

    /// Also write each run snapshot to this path.
    #[arg(long, value_name = "PATH")]
    pub out_file: Option<PathBuf>,

    /// External renderer invoked on every snapshot; the snapshot path is
    /// appended as an argument.
    #[arg(long, value_name = "CMD")]
    pub render: Option<String>,

    /// Seconds between reporter snapshots.
    #[arg(long, value_name = "SECS", default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,
}

impl RunBuildArgs {
    pub fn into_options(self) -> crate::runbuild::RunBuildOptions {
        crate::runbuild::RunBuildOptions {
            parallel: self.parallel,
            dry_run: self.dry_run,
            pipelines: self.pipelines,
            ci_stage: self.ci_stage,
            fail_on_pipeline_failure: self.fail_on_pipeline_failure,
            out_file: self.out_file,
            render: self.render,
            interval_secs: self.interval,
            ninja_program: PathBuf::from("ninja"),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ExecArgs {
    /// Path to the job descriptor file to execute.
    #[arg(long, value_name = "PATH")]
    pub descriptor: PathBuf,
}

// `CiStage` lives in `model` (it is persisted); teach clap about it here
// so the closed set is enforced at parse time.
impl clap::ValueEnum for CiStage {
    fn value_variants<'a>() -> &'a [Self] {
        &CiStage::ALL
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(PossibleValue::new(self.as_str()))
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
