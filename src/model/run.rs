// src/model/run.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::job::JobDescriptor;
use crate::model::utc_now_string;

/// Overall state of a run. `in_progress` until `run-build` finalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Success,
    Fail,
}

/// Schema version persisted with every run. Breaking layout changes
/// bump major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SchemaVersion {
    pub fn current() -> Self {
        Self {
            major: env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
            minor: env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
            patch: env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
        }
    }
}

/// Top-level run record, stored in `cache.json`. Created by `init` with
/// an empty job list; `run-build` embeds the registered descriptors and
/// later stamps `end_time` and the final status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Run {
    pub run_id: String,
    pub project: String,
    pub version: SchemaVersion,
    pub start_time: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    pub status: RunStatus,

    #[serde(default)]
    pub jobs: Vec<JobDescriptor>,
}

impl Run {
    pub fn new(project: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            project: project.to_string(),
            version: SchemaVersion::current(),
            start_time: utc_now_string(),
            end_time: None,
            status: RunStatus::InProgress,
            jobs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_runs_start_in_progress_with_unique_ids() {
        let a = Run::new("demo");
        let b = Run::new("demo");
        assert_eq!(a.status, RunStatus::InProgress);
        assert!(a.end_time.is_none());
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn status_tokens_match_the_schema() {
        assert_eq!(
            serde_json::to_value(RunStatus::InProgress).unwrap(),
            serde_json::json!("in_progress")
        );
        assert_eq!(
            serde_json::to_value(RunStatus::Fail).unwrap(),
            serde_json::json!("fail")
        );
    }
}
