//! # content-types
//!
//! Shared types for content-ops.
//!
//! This crate defines the data structures every other crate passes around:
//! - RequestOutcome: success flag, operation log and captured failures
//! - ExceptionChain: detached, serializable snapshot of an error and its causes
//! - Handle: opaque correlation id for asynchronous publish/index operations
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use content_types::RequestOutcome;
//!
//! let mut outcome = RequestOutcome::new();
//! outcome.log_info("GetItem: Start");
//! outcome.log_info("GetItem: End");
//! assert!(outcome.success());
//! assert_eq!(outcome.log().len(), 2);
//! ```

pub mod config;
pub mod error;
pub mod exception;
pub mod handle;
pub mod outcome;

pub use config::{GenerationSettings, PollerSettings, Settings};
pub use error::ContentError;
pub use exception::{ExceptionChain, MAX_CHAIN_DEPTH};
pub use handle::Handle;
pub use outcome::{LogEntry, LogLevel, OperationLog, RequestOutcome};
