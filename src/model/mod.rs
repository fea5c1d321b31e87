// src/model/mod.rs

//! Persisted records: the run, job descriptors, job statuses and the
//! aggregate run snapshot. Everything under the run directory is one of
//! these shapes, serialized as pretty-printed JSON.

pub mod job;
pub mod run;
pub mod snapshot;

pub use job::{CiStage, JobDescriptor, JobStatus};
pub use run::{Run, RunStatus, SchemaVersion};
pub use snapshot::{JobEntry, JobOutcome, PipelineSnapshot, RunSnapshot, StageSnapshot, StageStatus};

use chrono::{DateTime, NaiveDateTime, Utc};

/// The single timestamp format used in every persisted file.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Current UTC time, rendered with [`TIME_FORMAT`].
pub fn utc_now_string() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIME_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trips_through_the_fixed_format() {
        let now = utc_now_string();
        let parsed = parse_timestamp(&now).expect("fixed-format timestamp should parse");
        assert_eq!(format_timestamp(parsed), now);
    }
}
