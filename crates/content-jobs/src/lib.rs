//! Background jobs and completion tracking for content-ops.
//!
//! This crate runs long content operations off the request path and lets
//! callers follow them by polling.
//!
//! # Features
//!
//! - Single-flight execution per job name via [`JobRegistry`]
//! - Progress reporting through a per-run [`JobContext`]
//! - Failures and panics captured on the [`JobStatus`], never propagated
//! - Poll-until-terminal waiting with [`CompletionPoller`], optional timeout
//!   and cancellation
//!
//! # Example
//!
//! ```ignore
//! use content_jobs::{CompletionPoller, JobRegistry, PollerConfig};
//!
//! let registry = JobRegistry::new();
//! registry.submit("PerformanceGeneration", 155, |ctx| {
//!     generate_tree(&ctx)?;
//!     Ok(())
//! });
//!
//! let status = registry.status("PerformanceGeneration");
//! println!("{}% complete", status.percent_complete);
//!
//! let poller = CompletionPoller::new(PollerConfig::with_interval_ms(500));
//! let done = poller
//!     .wait_until_done(&handle, |h| publisher.get_status(h).map(|s| s.state))
//!     .await?;
//! ```

mod config;
mod context;
mod error;
mod poller;
mod registry;
mod status;

pub use config::{PollerConfig, MIN_POLL_INTERVAL};
pub use context::JobContext;
pub use error::JobError;
pub use poller::CompletionPoller;
pub use registry::{JobRegistry, Submission};
pub use status::{percent_complete, JobState, JobStatus};
