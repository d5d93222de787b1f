//! End-to-end test infrastructure for content-ops.
//!
//! Provides a shared TestHarness wiring a [`ContentService`] over in-memory
//! backends, plus helpers for waiting on background work.

use std::sync::Arc;
use std::time::Duration;

use content_jobs::{JobRegistry, JobStatus};
use content_service::ContentService;
use content_store::{InMemoryContentStore, InMemoryPublisher, InMemorySearchIndex};
use content_types::{RequestOutcome, Settings};

/// Shared test harness for E2E tests.
///
/// Publisher and index are kept as concrete types so tests can reach
/// backend-only controls like pausing an index.
pub struct TestHarness {
    pub settings: Settings,
    pub store: Arc<InMemoryContentStore>,
    pub publisher: Arc<InMemoryPublisher>,
    pub index: Arc<InMemorySearchIndex>,
    pub jobs: JobRegistry,
    pub service: ContentService,
}

impl TestHarness {
    /// Harness whose backends run at full speed.
    pub fn new() -> Self {
        Self::with_step_delay(Duration::ZERO)
    }

    /// Harness whose publisher and index pause after every item, so
    /// in-flight states can be observed.
    pub fn with_step_delay(step_delay: Duration) -> Self {
        Self::build(Settings::default(), step_delay)
    }

    pub fn build(settings: Settings, step_delay: Duration) -> Self {
        let store = Arc::new(InMemoryContentStore::with_site(&settings));
        let publisher = Arc::new(InMemoryPublisher::new(store.clone()).with_step_delay(step_delay));
        let index = Arc::new(
            InMemorySearchIndex::with_default_indexes(store.clone(), &settings)
                .expect("Failed to build default indexes")
                .with_step_delay(step_delay),
        );
        let jobs = JobRegistry::new();
        let service = ContentService::new(
            store.clone(),
            publisher.clone(),
            index.clone(),
            jobs.clone(),
            settings.clone(),
        );

        Self {
            settings,
            store,
            publisher,
            index,
            jobs,
            service,
        }
    }

    /// Path of the `Top_<prefix>` item an article tree is rooted at.
    pub fn top_path(&self, prefix: &str) -> String {
        format!("{}/Top_{prefix}", self.settings.generation.home_path)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll `jobs` every 5ms until `job_name` is terminal; panics after ~5s.
pub async fn wait_for_job(jobs: &JobRegistry, job_name: &str) -> JobStatus {
    for _ in 0..1000 {
        let status = jobs.status(job_name);
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {job_name} did not reach a terminal state");
}

/// Messages of every log entry, in order.
pub fn log_messages(outcome: &RequestOutcome) -> Vec<String> {
    outcome.log().iter().map(|e| e.message.clone()).collect()
}

/// The handle a publish handler logged as `Handle: <handle>`.
pub fn logged_handle(outcome: &RequestOutcome) -> Option<String> {
    log_messages(outcome)
        .into_iter()
        .find_map(|m| m.strip_prefix("Handle: ").map(str::to_string))
}
