// src/lib.rs

pub mod cli;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod model;
pub mod ninja;
pub mod registry;
pub mod report;
pub mod runbuild;
pub mod store;

use anyhow::Result;

use crate::cli::{CliArgs, Command};
use crate::store::StoreRoot;

/// High-level entry point used by `main.rs`.
///
/// Routes each subcommand to its owning module and returns the process
/// exit code:
/// - `init` / `add-job`: `0` on success, errors bubble up as non-zero.
/// - `exec`: the computed wrapper return code.
/// - `run-build`: `0` unless `--fail-on-pipeline-failure` is set and the
///   executor failed.
pub async fn run(args: CliArgs) -> Result<i32> {
    let root = StoreRoot::default_root();

    match args.command {
        Command::Init(init) => {
            store::init_run(&root, &init.project_name)?;
            Ok(0)
        }
        Command::AddJob(add_job) => {
            registry::add_job(&root, add_job.into_new_job()?)?;
            Ok(0)
        }
        Command::RunBuild(run_build) => {
            let options = run_build.into_options();
            runbuild::run_build(&root, options).await
        }
        Command::Exec(exec_args) => exec::run(&exec_args.descriptor).await,
    }
}
