// src/exec/artifacts.rs

//! Artifact preservation: after a job finalizes, its declared outputs
//! are copied into `artifacts/<pipeline>/<ci_stage>/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use crate::model::JobDescriptor;
use crate::store::RunDir;

/// Copy every declared output into the artifacts tree. A missing source
/// is a warning; any other I/O error fails the wrapper.
pub fn collect(descriptor: &JobDescriptor, run_dir: &RunDir) -> Result<()> {
    if descriptor.outputs.is_empty() {
        return Ok(());
    }

    let dest_dir = run_dir.artifact_dir_for(&descriptor.pipeline_name, descriptor.ci_stage);
    fs::create_dir_all(&dest_dir)
        .with_context(|| format!("creating artifact dir {:?}", dest_dir))?;

    for output in &descriptor.outputs {
        let source = resolve_output(descriptor, output);
        if !source.exists() {
            warn!(
                job_id = %descriptor.job_id,
                output = %output,
                "declared output does not exist; skipping artifact copy"
            );
            continue;
        }

        let name = source
            .file_name()
            .ok_or_else(|| anyhow!("output path {:?} has no basename", source))?;
        let dest = dest_dir.join(name);

        if source.is_dir() {
            copy_dir_recursive(&source, &dest)
                .with_context(|| format!("copying artifact tree {:?}", source))?;
        } else {
            fs::copy(&source, &dest)
                .with_context(|| format!("copying artifact {:?} to {:?}", source, dest))?;
        }
        debug!(job_id = %descriptor.job_id, source = ?source, dest = ?dest, "preserved artifact");
    }

    Ok(())
}

/// Relative outputs are resolved against the job's working directory.
fn resolve_output(descriptor: &JobDescriptor, output: &str) -> PathBuf {
    let path = PathBuf::from(output);
    if path.is_absolute() {
        return path;
    }
    match &descriptor.cwd {
        Some(cwd) => cwd.join(path),
        None => path,
    }
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
