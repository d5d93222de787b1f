//! Job registry: single-flight execution and status tracking per job name.
//!
//! The `JobRegistry` owns one record per job name. Submitting work for a name
//! whose previous run is still active is a no-op that returns the running
//! status; otherwise the record is reset and the work starts on tokio's
//! blocking pool. Progress flows back through a per-run channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use content_types::ExceptionChain;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

use crate::context::{JobContext, ProgressEvent};
use crate::error::JobError;
use crate::status::{percent_complete, JobState, JobStatus};

type JobMap = Arc<Mutex<HashMap<String, JobRecord>>>;

/// Mutable state behind one job name.
#[derive(Debug)]
struct JobRecord {
    name: String,
    state: Option<JobState>,
    processed: u64,
    total: u64,
    submitted_at: Option<DateTime<Utc>>,
    started: Option<Instant>,
    elapsed_ms: u64,
    /// Set when the run reaches a terminal state
    ended: Option<Instant>,
    messages: Vec<String>,
    exceptions: Vec<ExceptionChain>,
    /// Bumped on every accepted submission
    generation: u64,
}

impl JobRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: None,
            processed: 0,
            total: 0,
            submitted_at: None,
            started: None,
            elapsed_ms: 0,
            ended: None,
            messages: Vec::new(),
            exceptions: Vec::new(),
            generation: 0,
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.state, Some(JobState::Queued | JobState::Running))
    }

    fn reset(&mut self, initial_total: u64) {
        self.generation += 1;
        self.state = Some(JobState::Queued);
        self.processed = 0;
        self.total = initial_total;
        self.submitted_at = Some(Utc::now());
        self.started = Some(Instant::now());
        self.elapsed_ms = 0;
        self.ended = None;
        self.messages.clear();
        self.exceptions.clear();
    }

    fn apply(&mut self, event: ProgressEvent) {
        if !self.is_active() {
            return;
        }
        self.state = Some(JobState::Running);
        match event {
            ProgressEvent::Started => {}
            ProgressEvent::Total(total) => self.total = total,
            ProgressEvent::Processed(processed) => self.processed = processed,
            ProgressEvent::Advance(count) => self.processed = self.processed.saturating_add(count),
            ProgressEvent::Message(message) => self.messages.push(message),
            ProgressEvent::Exception(exception) => self.exceptions.push(exception),
        }
    }

    fn finish(&mut self, state: JobState, exception: Option<ExceptionChain>) {
        if let Some(exception) = exception {
            self.exceptions.push(exception);
        }
        if let Some(started) = self.started.take() {
            self.elapsed_ms = millis(started.elapsed());
        }
        self.submitted_at = None;
        self.ended = Some(Instant::now());
        self.state = Some(state);
    }

    fn snapshot(&self) -> JobStatus {
        let execution_time_ms = match self.started {
            Some(started) => millis(started.elapsed()),
            None => self.elapsed_ms,
        };
        JobStatus {
            name: self.name.clone(),
            state: self.state,
            processed: self.processed,
            total: self.total,
            percent_complete: percent_complete(self.processed, self.total),
            submitted_at: self.submitted_at,
            execution_time_ms,
            job_running: self.is_active(),
            messages: self.messages.clone(),
            exceptions: self.exceptions.clone(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn lock(jobs: &JobMap) -> MutexGuard<'_, HashMap<String, JobRecord>> {
    // A panic while holding the lock leaves the map itself consistent.
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply_event(jobs: &JobMap, job_name: &str, generation: u64, event: ProgressEvent) {
    let mut map = lock(jobs);
    match map.get_mut(job_name) {
        Some(record) if record.generation == generation => record.apply(event),
        _ => debug!(job = %job_name, generation, "Dropping progress event from superseded run"),
    }
}

/// Result of [`JobRegistry::submit`], decided under the registry lock.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// This call started a new run (which may already have failed to start).
    Accepted(JobStatus),
    /// A run of the same name is still active; its status is returned unchanged.
    AlreadyActive(JobStatus),
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted(_))
    }

    pub fn status(&self) -> &JobStatus {
        match self {
            Submission::Accepted(status) | Submission::AlreadyActive(status) => status,
        }
    }

    pub fn into_status(self) -> JobStatus {
        match self {
            Submission::Accepted(status) | Submission::AlreadyActive(status) => status,
        }
    }
}

/// Registry of single-flight background jobs.
///
/// Cloning is cheap; clones share the same records.
///
/// # Example
///
/// ```
/// use content_jobs::{JobRegistry, JobState};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let registry = JobRegistry::new();
/// let first = registry.submit("rebuild", 3, |ctx| {
///     for _ in 0..3 {
///         ctx.advance(1);
///     }
///     Ok(())
/// });
/// assert!(first.is_accepted());
/// assert_eq!(first.status().state, Some(JobState::Queued));
///
/// // A second submission while the first is active changes nothing.
/// let again = registry.submit("rebuild", 99, |_| Ok(()));
/// assert!(!again.is_accepted());
/// assert_eq!(again.status().total, 3);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: JobMap,
}

impl JobRegistry {
    /// Create a new empty job registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `work` under `job_name` unless a run of that name is still active.
    ///
    /// Returns [`Submission::Accepted`] with the fresh status when this call
    /// started the run, or [`Submission::AlreadyActive`] with the active
    /// run's status when it did not. Failures of the work itself are
    /// recorded on the status, never returned.
    pub fn submit<F>(&self, job_name: &str, initial_total: u64, work: F) -> Submission
    where
        F: FnOnce(JobContext) -> Result<(), JobError> + Send + 'static,
    {
        let mut map = lock(&self.jobs);
        let record = map
            .entry(job_name.to_string())
            .or_insert_with(|| JobRecord::new(job_name));

        if record.is_active() {
            debug!(job = %job_name, "Job already active, submission ignored");
            return Submission::AlreadyActive(record.snapshot());
        }

        record.reset(initial_total);
        let generation = record.generation;

        let runtime = match RuntimeHandle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                let err = JobError::NoRuntime;
                warn!(job = %job_name, error = %err, "Job could not be started");
                record.finish(JobState::Failed, Some(ExceptionChain::capture(&err)));
                return Submission::Accepted(record.snapshot());
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = JobContext::new(job_name, generation, tx);
        runtime.spawn(drive(
            self.jobs.clone(),
            job_name.to_string(),
            generation,
            ctx,
            rx,
            work,
        ));

        info!(job = %job_name, generation, total = initial_total, "Job submitted");
        Submission::Accepted(record.snapshot())
    }

    /// Status of a job slot; a never-run name yields a status with no state.
    pub fn status(&self, job_name: &str) -> JobStatus {
        lock(&self.jobs)
            .get(job_name)
            .map(JobRecord::snapshot)
            .unwrap_or_else(|| JobStatus::unknown(job_name))
    }

    /// Status of every known job slot, sorted by name.
    pub fn all_status(&self) -> Vec<JobStatus> {
        let mut all: Vec<JobStatus> = lock(&self.jobs).values().map(JobRecord::snapshot).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Check if a job is queued or running.
    pub fn is_running(&self, job_name: &str) -> bool {
        lock(&self.jobs)
            .get(job_name)
            .map(JobRecord::is_active)
            .unwrap_or(false)
    }

    /// Get the number of known job slots.
    pub fn job_count(&self) -> usize {
        lock(&self.jobs).len()
    }

    /// Forget the oldest terminal records until at most `keep` remain.
    ///
    /// Active runs are never removed. Returns the number of records dropped.
    pub fn prune_terminal(&self, keep: usize) -> usize {
        let mut map = lock(&self.jobs);
        let mut ended: Vec<(Instant, String)> = map
            .values()
            .filter(|record| !record.is_active())
            .filter_map(|record| record.ended.map(|at| (at, record.name.clone())))
            .collect();
        if ended.len() <= keep {
            return 0;
        }
        ended.sort();
        let excess = ended.len() - keep;
        for (_, name) in ended.into_iter().take(excess) {
            map.remove(&name);
        }
        debug!(removed = excess, kept = keep, "Pruned terminal job records");
        excess
    }
}

async fn drive<F>(
    jobs: JobMap,
    name: String,
    generation: u64,
    ctx: JobContext,
    mut rx: UnboundedReceiver<(u64, ProgressEvent)>,
    work: F,
) where
    F: FnOnce(JobContext) -> Result<(), JobError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || {
        ctx.started();
        work(ctx)
    });

    // Ends once the context is dropped, i.e. when the work returns or unwinds.
    while let Some((event_generation, event)) = rx.recv().await {
        apply_event(&jobs, &name, event_generation, event);
    }

    let (state, exception) = match task.await {
        Ok(Ok(())) => (JobState::Finished, None),
        Ok(Err(err)) => {
            warn!(job = %name, error = %err, "Job failed");
            (JobState::Failed, Some(ExceptionChain::capture(&err)))
        }
        Err(join_err) if join_err.is_panic() => {
            let chain = ExceptionChain::from_panic(join_err.into_panic().as_ref());
            let err = JobError::Panicked(chain.message.clone());
            warn!(job = %name, error = %err, "Job failed");
            (JobState::Failed, Some(chain))
        }
        Err(join_err) => {
            warn!(job = %name, error = %join_err, "Job was cancelled");
            (JobState::Failed, Some(ExceptionChain::capture(&join_err)))
        }
    };

    let mut map = lock(&jobs);
    if let Some(record) = map.get_mut(&name).filter(|r| r.generation == generation) {
        record.finish(state, exception);
        info!(
            job = %name,
            state = ?state,
            processed = record.processed,
            duration_ms = record.elapsed_ms,
            "Job completed"
        );
    }
}
