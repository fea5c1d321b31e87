// src/store/mod.rs

//! The Run Store: on-disk layout for a run.
//!
//! ```text
//! <root>/runs/<run_id>/
//!   cache.json            run record + embedded descriptors
//!   jobs/<job_id>.json    one descriptor per file
//!   status/<job_id>.json  one status per file
//!   litani.ninja          emitted DAG file
//!   run.json              latest snapshot
//!   artifacts/<pipeline>/<ci_stage>/...
//! <root>/cache_pointer    absolute path of the active run directory
//! <root>/latest           symlink to the same directory
//! ```
//!
//! The root defaults to `<tmp>/litani` but is an explicit parameter
//! everywhere so tests can isolate runs in scratch directories.

pub mod atomic;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::errors::LitaniError;
use crate::model::{CiStage, JobDescriptor, JobStatus, Run, RunSnapshot};

pub const CACHE_FILE: &str = "cache.json";
pub const NINJA_FILE: &str = "litani.ninja";
pub const RUN_JSON: &str = "run.json";

/// Base directory holding all runs plus the cache pointer.
#[derive(Debug, Clone)]
pub struct StoreRoot {
    base: PathBuf,
}

impl StoreRoot {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The platform default: `<tmp>/litani`.
    pub fn default_root() -> Self {
        Self::new(std::env::temp_dir().join("litani"))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.base.join("runs")
    }

    pub fn cache_pointer_path(&self) -> PathBuf {
        self.base.join("cache_pointer")
    }

    pub fn latest_link_path(&self) -> PathBuf {
        self.base.join("latest")
    }

    /// Create the directory tree for a fresh run.
    pub fn create_run_dir(&self, run_id: &str) -> Result<RunDir> {
        let run_dir = RunDir::new(self.runs_dir().join(run_id));
        for dir in [
            run_dir.path().to_path_buf(),
            run_dir.jobs_dir(),
            run_dir.status_dir(),
            run_dir.artifacts_dir(),
        ] {
            fs::create_dir_all(&dir).with_context(|| format!("creating dir {:?}", dir))?;
        }
        Ok(run_dir)
    }

    /// Atomically publish `run_dir` as the active run: rewrite the
    /// pointer file and repoint the `latest` symlink.
    pub fn publish_pointer(&self, run_dir: &Path) -> Result<()> {
        let mut contents = run_dir.display().to_string();
        contents.push('\n');
        atomic::write_atomic(&self.cache_pointer_path(), contents.as_bytes())?;
        atomic::symlink_atomic(run_dir, &self.latest_link_path())?;
        debug!(run_dir = ?run_dir, "published cache pointer");
        Ok(())
    }

    /// Resolve the active run directory through the pointer file.
    pub fn current_run_dir(&self) -> Result<RunDir> {
        let pointer = self.cache_pointer_path();
        let contents = fs::read_to_string(&pointer)
            .map_err(|_| LitaniError::NoActiveRun(pointer.clone()))?;
        let path = PathBuf::from(contents.trim());
        if !path.is_dir() {
            return Err(LitaniError::NoActiveRun(path).into());
        }
        Ok(RunDir::new(path))
    }
}

/// One run's directory and the files inside it.
#[derive(Debug, Clone)]
pub struct RunDir {
    root: PathBuf,
}

impl RunDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Recover the run directory from a status file path
    /// (`<run>/status/<job_id>.json`).
    pub fn containing_status_file(status_file: &Path) -> Result<RunDir> {
        status_file
            .parent()
            .and_then(Path::parent)
            .map(RunDir::new)
            .ok_or_else(|| {
                anyhow::anyhow!("status file {:?} is not inside a run directory", status_file)
            })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn cache_file(&self) -> PathBuf {
        self.root.join(CACHE_FILE)
    }

    pub fn ninja_file(&self) -> PathBuf {
        self.root.join(NINJA_FILE)
    }

    pub fn run_json(&self) -> PathBuf {
        self.root.join(RUN_JSON)
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    pub fn status_dir(&self) -> PathBuf {
        self.root.join("status")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    pub fn job_file(&self, job_id: &str) -> PathBuf {
        self.jobs_dir().join(format!("{job_id}.json"))
    }

    pub fn status_file(&self, job_id: &str) -> PathBuf {
        self.status_dir().join(format!("{job_id}.json"))
    }

    pub fn artifact_dir_for(&self, pipeline: &str, stage: CiStage) -> PathBuf {
        self.artifacts_dir().join(pipeline).join(stage.as_str())
    }

    pub fn load_cache(&self) -> Result<Run> {
        let path = self.cache_file();
        let contents =
            fs::read_to_string(&path).with_context(|| format!("reading run cache {:?}", path))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing run cache {:?}", path))
    }

    pub fn store_cache(&self, run: &Run) -> Result<()> {
        atomic::write_json_atomic(&self.cache_file(), run)
    }

    /// Read every registered descriptor, ordered by job id for
    /// deterministic downstream emission. An unreadable file is fatal and
    /// names the offending path.
    pub fn load_descriptors(&self) -> Result<Vec<JobDescriptor>> {
        let mut descriptors = Vec::new();
        for path in json_files(&self.jobs_dir())? {
            let contents = fs::read_to_string(&path)
                .map_err(|_| LitaniError::DescriptorRead(path.clone()))?;
            let descriptor: JobDescriptor = serde_json::from_str(&contents)
                .map_err(|_| LitaniError::DescriptorRead(path.clone()))?;
            descriptors.push(descriptor);
        }
        descriptors.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        Ok(descriptors)
    }

    /// Read every status file, keyed by job id. Each file is written
    /// atomically by its owning wrapper, so anything present parses.
    pub fn load_statuses(&self) -> Result<HashMap<String, JobStatus>> {
        let mut statuses = HashMap::new();
        for path in json_files(&self.status_dir())? {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("reading job status {:?}", path))?;
            let status: JobStatus = serde_json::from_str(&contents)
                .with_context(|| format!("parsing job status {:?}", path))?;
            statuses.insert(status.job_id.clone(), status);
        }
        Ok(statuses)
    }

    pub fn write_snapshot(&self, snapshot: &RunSnapshot) -> Result<()> {
        atomic::write_json_atomic(&self.run_json(), snapshot)
    }
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    for entry in fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// `init`: create a run directory, seed `cache.json` and publish the
/// pointer to it.
pub fn init_run(root: &StoreRoot, project_name: &str) -> Result<RunDir> {
    let run = Run::new(project_name);
    let run_dir = root.create_run_dir(&run.run_id)?;
    run_dir.store_cache(&run)?;
    root.publish_pointer(run_dir.path())?;

    info!(
        run_id = %run.run_id,
        project = %run.project,
        path = ?run_dir.path(),
        "initialized run"
    );
    Ok(run_dir)
}
