// src/model/snapshot.rs

//! The aggregate run snapshot: a derived, read-only view merging
//! `cache.json` with every job status file. The reporter rebuilds it on
//! each tick; any snapshot is a valid point-in-time merge.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::job::{CiStage, JobDescriptor, JobStatus};
use crate::model::run::{Run, RunStatus, SchemaVersion};

/// Classification of a finished job, derived from its status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Success,
    /// The job misbehaved (nonzero return, timeout) but a descriptor
    /// flag downgraded the failure.
    FailIgnored,
    Fail,
}

impl JobOutcome {
    /// `None` while the job is still running (or was never started).
    pub fn of(status: &JobStatus) -> Option<JobOutcome> {
        if !status.complete {
            return None;
        }
        let d = &status.wrapper_arguments;

        if status.timeout_reached {
            return if d.timeout_ok || d.timeout_ignore {
                Some(JobOutcome::FailIgnored)
            } else {
                Some(JobOutcome::Fail)
            };
        }

        let code = status.command_return_code.unwrap_or(-1);
        if code == 0 {
            Some(JobOutcome::Success)
        } else if d.ignore_returns.contains(&code) || d.ok_returns.contains(&code) {
            Some(JobOutcome::FailIgnored)
        } else {
            Some(JobOutcome::Fail)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    Fail,
    FailIgnored,
}

/// One job as it appears in the snapshot: the descriptor, the status
/// file contents if any, and the derived outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEntry {
    pub descriptor: JobDescriptor,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JobOutcome>,

    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub name: CiStage,
    pub status: StageStatus,
    /// Percentage of member jobs with a finalized status (100 for an
    /// empty stage).
    pub progress: u8,
    pub jobs: Vec<JobEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub name: String,
    pub ci_stages: Vec<StageSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: String,
    pub project: String,
    pub version: SchemaVersion,
    pub start_time: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    pub status: RunStatus,
    pub pipelines: Vec<PipelineSnapshot>,
}

impl RunSnapshot {
    /// Merge the run record with the status files read so far. Pipelines
    /// are emitted in name order; every pipeline carries the full fixed
    /// stage sequence so the shape is stable for renderers.
    pub fn assemble(run: &Run, statuses: &HashMap<String, JobStatus>) -> RunSnapshot {
        let mut by_pipeline: BTreeMap<&str, Vec<&JobDescriptor>> = BTreeMap::new();
        for descriptor in &run.jobs {
            by_pipeline
                .entry(descriptor.pipeline_name.as_str())
                .or_default()
                .push(descriptor);
        }

        let pipelines = by_pipeline
            .into_iter()
            .map(|(name, descriptors)| PipelineSnapshot {
                name: name.to_string(),
                ci_stages: CiStage::ALL
                    .iter()
                    .map(|stage| assemble_stage(*stage, &descriptors, statuses))
                    .collect(),
            })
            .collect();

        RunSnapshot {
            run_id: run.run_id.clone(),
            project: run.project.clone(),
            version: run.version,
            start_time: run.start_time.clone(),
            end_time: run.end_time.clone(),
            status: run.status,
            pipelines,
        }
    }
}

fn assemble_stage(
    stage: CiStage,
    descriptors: &[&JobDescriptor],
    statuses: &HashMap<String, JobStatus>,
) -> StageSnapshot {
    let jobs: Vec<JobEntry> = descriptors
        .iter()
        .filter(|d| d.ci_stage == stage)
        .map(|d| {
            let status = statuses.get(&d.job_id).cloned();
            let outcome = status.as_ref().and_then(JobOutcome::of);
            let complete = status.as_ref().map(|s| s.complete).unwrap_or(false);
            JobEntry {
                descriptor: (*d).clone(),
                status,
                outcome,
                complete,
            }
        })
        .collect();

    let total = jobs.len();
    let completed = jobs.iter().filter(|j| j.complete).count();
    let progress = if total == 0 {
        100
    } else {
        (completed * 100 / total) as u8
    };

    let status = if jobs.iter().any(|j| j.outcome == Some(JobOutcome::Fail)) {
        StageStatus::Fail
    } else if jobs
        .iter()
        .any(|j| j.outcome == Some(JobOutcome::FailIgnored))
    {
        StageStatus::FailIgnored
    } else {
        StageStatus::Success
    };

    StageSnapshot {
        name: stage,
        status,
        progress,
        jobs,
    }
}
