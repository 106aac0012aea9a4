//! Refresh job run accounting

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Module;

/// Name recorded for scheduler refresh runs.
pub const CACHE_REFRESH_JOB: &str = "cache_refresh";

/// Lifecycle status of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Success,
    Partial,
    /// The tick stopped early on a configuration or persistence error
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Partial => "partial",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(JobStatus::Running),
            "success" => Some(JobStatus::Success),
            "partial" => Some(JobStatus::Partial),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An in-flight refresh run.
///
/// Only the tick that began it mutates it; [`JobRun::finish`] consumes the
/// run, so an outcome is produced exactly once.
#[derive(Debug)]
pub struct JobRun {
    started_at: DateTime<Utc>,
    ok_count: usize,
    fail_count: usize,
    notes: Vec<String>,
}

impl JobRun {
    pub fn begin(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ok_count: 0,
            fail_count: 0,
            notes: Vec::new(),
        }
    }

    /// Account for one module summary fetch.
    pub fn record_module(&mut self, module: Module, items: usize, errors: usize) {
        self.ok_count += items.saturating_sub(errors);
        self.fail_count += errors;
        if errors > 0 {
            self.notes.push(format!("{}_errors={}", module, errors));
        }
    }

    /// Account for one failed (instrument, range) series fetch.
    pub fn record_series_failure(&mut self) {
        self.fail_count += 1;
    }

    pub fn finish(self, finished_at: DateTime<Utc>) -> JobRunOutcome {
        let status = if self.fail_count > 0 {
            JobStatus::Partial
        } else {
            JobStatus::Success
        };
        let duration_ms = (finished_at - self.started_at).num_milliseconds().max(0);

        JobRunOutcome {
            job_name: CACHE_REFRESH_JOB.to_string(),
            started_at: self.started_at,
            finished_at,
            status,
            ok_count: self.ok_count,
            fail_count: self.fail_count,
            notes: if self.notes.is_empty() {
                None
            } else {
                Some(self.notes.join(", "))
            },
            duration_ms,
        }
    }

    /// Close a run that could not complete. Counts gathered so far are kept
    /// and the error is appended to the notes.
    pub fn abort(mut self, finished_at: DateTime<Utc>, reason: &str) -> JobRunOutcome {
        self.notes.push(format!("aborted: {}", reason));
        JobRunOutcome {
            status: JobStatus::Failed,
            ..self.finish(finished_at)
        }
    }
}

/// Finalised summary of one refresh tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRunOutcome {
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: JobStatus,
    pub ok_count: usize,
    pub fail_count: usize,
    pub notes: Option<String>,
    pub duration_ms: i64,
}
