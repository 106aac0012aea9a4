//! Job run display model

use serde::Serialize;
use tabled::Tabled;

use crate::models::JobRunOutcome;
use crate::output::formatters::{format_duration_ms, format_time};
use crate::storage::JobRunRecord;

#[derive(Debug, Clone, Tabled, Serialize)]
pub struct JobRunDisplay {
    #[tabled(rename = "ID")]
    pub id: String,

    #[tabled(rename = "JOB")]
    pub job_name: String,

    #[tabled(rename = "STARTED")]
    pub started_at: String,

    #[tabled(rename = "DURATION")]
    pub duration: String,

    #[tabled(rename = "STATUS")]
    pub status: String,

    #[tabled(rename = "OK")]
    pub ok_count: i64,

    #[tabled(rename = "FAIL")]
    pub fail_count: i64,

    #[tabled(rename = "NOTES")]
    pub notes: String,
}

impl From<&JobRunRecord> for JobRunDisplay {
    fn from(run: &JobRunRecord) -> Self {
        let duration = run
            .finished_at
            .map(|end| format_duration_ms((end - run.started_at).num_milliseconds()))
            .unwrap_or_else(|| "-".to_string());

        Self {
            id: run.id.to_string(),
            job_name: run.job_name.clone(),
            started_at: format_time(Some(run.started_at)),
            duration,
            status: run.status.to_string(),
            ok_count: run.ok_count,
            fail_count: run.fail_count,
            notes: run.notes.clone().unwrap_or_default(),
        }
    }
}

/// Outcome of a tick that was just run; it has no row id yet.
impl From<&JobRunOutcome> for JobRunDisplay {
    fn from(outcome: &JobRunOutcome) -> Self {
        Self {
            id: "-".to_string(),
            job_name: outcome.job_name.clone(),
            started_at: format_time(Some(outcome.started_at)),
            duration: format_duration_ms(outcome.duration_ms),
            status: outcome.status.to_string(),
            ok_count: outcome.ok_count as i64,
            fail_count: outcome.fail_count as i64,
            notes: outcome.notes.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_running_job_has_no_duration() {
        let record = JobRunRecord {
            id: 7,
            job_name: "cache_refresh".to_string(),
            started_at: Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap(),
            finished_at: None,
            status: JobStatus::Running,
            ok_count: 0,
            fail_count: 0,
            notes: None,
        };

        let row = JobRunDisplay::from(&record);
        assert_eq!(row.id, "7");
        assert_eq!(row.duration, "-");
        assert_eq!(row.status, "running");
        assert_eq!(row.started_at, "2026-01-15 10:30 CET");
    }

    #[test]
    fn test_finished_job_duration() {
        let started = Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap();
        let record = JobRunRecord {
            id: 8,
            job_name: "cache_refresh".to_string(),
            started_at: started,
            finished_at: Some(started + Duration::milliseconds(2500)),
            status: JobStatus::Partial,
            ok_count: 11,
            fail_count: 2,
            notes: Some("mag7_errors=2".to_string()),
        };

        let row = JobRunDisplay::from(&record);
        assert_eq!(row.duration, "2.5s");
        assert_eq!(row.notes, "mag7_errors=2");
    }
}
