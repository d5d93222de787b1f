//! Job lifecycle states and status snapshots.

use chrono::{DateTime, Utc};
use content_types::ExceptionChain;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    /// Accepted, work not yet started
    Queued,
    /// Work is executing
    Running,
    /// Work returned successfully
    Finished,
    /// Work returned an error or panicked
    Failed,
}

impl JobState {
    /// `Finished` and `Failed` are terminal; a slot in either state accepts a new submission.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }
}

/// Snapshot of one job slot, safe to hand to callers and serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Job slot name
    pub name: String,
    /// `None` when the slot has never run
    pub state: Option<JobState>,
    pub processed: u64,
    /// Zero until the job knows its total
    pub total: u64,
    /// Whole percent in `[0, 100]`
    pub percent_complete: u8,
    /// Submission time; cleared once the run ends
    pub submitted_at: Option<DateTime<Utc>>,
    /// Elapsed while active, frozen at completion
    pub execution_time_ms: u64,
    pub job_running: bool,
    pub messages: Vec<String>,
    pub exceptions: Vec<ExceptionChain>,
}

impl JobStatus {
    /// Status of a slot that never ran.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: None,
            processed: 0,
            total: 0,
            percent_complete: 0,
            submitted_at: None,
            execution_time_ms: 0,
            job_running: false,
            messages: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    /// Whether the last run reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_some_and(|s| s.is_terminal())
    }

    pub fn is_failed(&self) -> bool {
        self.state == Some(JobState::Failed)
    }
}

/// Whole-percent progress: 0 with no total or no processed items, capped at 100.
pub fn percent_complete(processed: u64, total: u64) -> u8 {
    if total == 0 || processed < 1 {
        return 0;
    }
    let percent = (u128::from(processed) * 100) / u128::from(total);
    percent.min(100) as u8
}
