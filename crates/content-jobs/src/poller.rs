//! Poll-based completion waiting for asynchronous operations.
//!
//! The poller repeatedly asks a status provider for the state behind a
//! [`Handle`] and sleeps between checks until a terminal state is seen, the
//! optional deadline passes, or the caller cancels.

use std::future::pending;

use content_types::Handle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::PollerConfig;
use crate::status::JobState;

/// Waits for asynchronous operations to reach a terminal state.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionPoller {
    config: PollerConfig,
}

impl CompletionPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Poll `status` until it reports a terminal state.
    ///
    /// Returns `Ok(true)` on completion and `Ok(false)` if the configured
    /// timeout elapses first. Provider errors are returned as-is.
    pub async fn wait_until_done<E, F>(&self, handle: &Handle, status: F) -> Result<bool, E>
    where
        F: FnMut(&Handle) -> Result<JobState, E>,
    {
        self.poll(handle, status, None).await
    }

    /// Like [`wait_until_done`](Self::wait_until_done), returning `Ok(false)`
    /// as soon as `cancel` fires.
    pub async fn wait_until_done_with_cancel<E, F>(
        &self,
        handle: &Handle,
        status: F,
        cancel: &CancellationToken,
    ) -> Result<bool, E>
    where
        F: FnMut(&Handle) -> Result<JobState, E>,
    {
        self.poll(handle, status, Some(cancel)).await
    }

    async fn poll<E, F>(
        &self,
        handle: &Handle,
        mut status: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<bool, E>
    where
        F: FnMut(&Handle) -> Result<JobState, E>,
    {
        let interval = self.config.interval();
        let deadline = self.config.timeout().map(|t| Instant::now() + t);
        let mut attempts: u64 = 0;

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                debug!(handle = %handle, attempts, "Polling cancelled");
                return Ok(false);
            }

            let state = status(handle)?;
            attempts += 1;
            if state.is_terminal() {
                debug!(handle = %handle, attempts, state = ?state, "Operation complete");
                return Ok(true);
            }

            let mut wait = interval;
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    debug!(handle = %handle, attempts, "Polling timed out");
                    return Ok(false);
                }
                wait = wait.min(remaining);
            }

            let cancelled = async {
                match cancel {
                    Some(token) => token.cancelled().await,
                    None => pending::<()>().await,
                }
            };

            tokio::select! {
                _ = sleep(wait) => {}
                _ = cancelled => {
                    debug!(handle = %handle, attempts, "Polling cancelled");
                    return Ok(false);
                }
            }
        }
    }
}
