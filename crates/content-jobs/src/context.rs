//! Progress side channel handed to a running job.

use content_types::ExceptionChain;
use tokio::sync::mpsc::UnboundedSender;

/// Progress update sent from job work to the registry driver.
#[derive(Debug)]
pub(crate) enum ProgressEvent {
    Started,
    Total(u64),
    Processed(u64),
    Advance(u64),
    Message(String),
    Exception(ExceptionChain),
}

/// Handle through which job work reports progress.
///
/// Each run gets its own context. It is moved into the work closure, so the
/// channel closes as soon as the work returns. Sends never block and are
/// silently dropped once the registry stops listening.
#[derive(Debug)]
pub struct JobContext {
    job_name: String,
    generation: u64,
    tx: UnboundedSender<(u64, ProgressEvent)>,
}

impl JobContext {
    pub(crate) fn new(
        job_name: impl Into<String>,
        generation: u64,
        tx: UnboundedSender<(u64, ProgressEvent)>,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            generation,
            tx,
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Set the number of items the job expects to process.
    pub fn set_total(&self, total: u64) {
        self.send(ProgressEvent::Total(total));
    }

    pub fn set_processed(&self, processed: u64) {
        self.send(ProgressEvent::Processed(processed));
    }

    /// Add `count` to the processed counter.
    pub fn advance(&self, count: u64) {
        self.send(ProgressEvent::Advance(count));
    }

    pub fn message(&self, message: impl Into<String>) {
        self.send(ProgressEvent::Message(message.into()));
    }

    /// Record a non-fatal failure on the job status.
    pub fn log_exception(&self, exception: ExceptionChain) {
        self.send(ProgressEvent::Exception(exception));
    }

    pub(crate) fn started(&self) {
        self.send(ProgressEvent::Started);
    }

    fn send(&self, event: ProgressEvent) {
        // receiver gone means the run was already recorded
        let _ = self.tx.send((self.generation, event));
    }
}
