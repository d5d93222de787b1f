//! Request outcome envelope.
//!
//! Every externally triggered operation returns a `RequestOutcome`: a success
//! flag, an append-only operation log and the failures captured on the way.
//! Each log entry records the milliseconds elapsed since the previous entry,
//! so the log doubles as a coarse profile of the operation.

use std::error::Error;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::exception::ExceptionChain;

/// Severity of an operation log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warn,
    Fail,
    Fatal,
    Error,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "Info",
            LogLevel::Warn => "Warn",
            LogLevel::Fail => "Fail",
            LogLevel::Fatal => "Fatal",
            LogLevel::Error => "Error",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single time-stamped log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    /// Milliseconds since the previous entry (or since the outcome was created)
    pub duration_ms: i64,
    pub level: LogLevel,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] - {}|{}|{} - {}",
            self.level.as_str().to_uppercase(),
            self.timestamp.format("%Y-%m-%d"),
            self.timestamp.format("%H:%M:%S"),
            self.duration_ms,
            self.message
        )
    }
}

/// Append-only sequence of log entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationLog {
    entries: Vec<LogEntry>,
}

impl OperationLog {
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Sum of all per-entry durations.
    pub fn total_duration_ms(&self) -> i64 {
        self.entries.iter().map(|e| e.duration_ms).sum()
    }

    /// Whether any entry carries exactly this message.
    pub fn contains(&self, message: &str) -> bool {
        self.entries.iter().any(|e| e.message == message)
    }

    fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }
}

impl fmt::Display for OperationLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a OperationLog {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Response envelope shared by every operation.
///
/// `success` starts out true. Once any failure path clears it, nothing in
/// this type sets it back: `log_fail` can only clear the flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOutcome {
    success: bool,
    log: OperationLog,
    exceptions: Vec<ExceptionChain>,
    #[serde(skip, default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(skip, default = "Utc::now")]
    last_logged_at: DateTime<Utc>,
}

impl Default for RequestOutcome {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestOutcome {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            success: true,
            log: OperationLog::default(),
            exceptions: Vec::new(),
            created_at: now,
            last_logged_at: now,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    pub fn exceptions(&self) -> &[ExceptionChain] {
        &self.exceptions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Clear the success flag.
    pub fn mark_failed(&mut self) {
        self.success = false;
    }

    /// Append an entry at the given level.
    pub fn log_message(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        let now = Utc::now();
        let duration_ms = now.timestamp_millis() - self.last_logged_at.timestamp_millis();
        self.last_logged_at = now;

        match level {
            LogLevel::Info => info!(duration_ms, "{message}"),
            LogLevel::Warn => warn!(duration_ms, "{message}"),
            LogLevel::Fail | LogLevel::Fatal | LogLevel::Error => {
                error!(severity = level.as_str(), duration_ms, "{message}")
            }
            LogLevel::Debug => debug!(duration_ms, "{message}"),
            LogLevel::Trace => trace!(duration_ms, "{message}"),
        }

        self.log.push(LogEntry {
            timestamp: now,
            duration_ms,
            level,
            message,
        });
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log_message(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        self.log_message(LogLevel::Warn, message);
    }

    pub fn log_debug(&mut self, message: impl Into<String>) {
        self.log_message(LogLevel::Debug, message);
    }

    pub fn log_trace(&mut self, message: impl Into<String>) {
        self.log_message(LogLevel::Trace, message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.log_message(LogLevel::Error, message);
    }

    /// Append a Fail entry; clears `success` when `set_failure` is true.
    pub fn log_fail(&mut self, message: impl Into<String>, set_failure: bool) {
        if set_failure {
            self.success = false;
        }
        self.log_message(LogLevel::Fail, message);
    }

    pub fn push_exception(&mut self, exception: ExceptionChain) {
        self.exceptions.push(exception);
    }

    /// Snapshot a typed error into the exception list without touching `success`.
    pub fn add_exception<E: Error + 'static>(&mut self, err: &E) {
        self.exceptions.push(ExceptionChain::capture(err));
    }

    /// Record an unexpected failure: snapshot, error entry, `success = false`.
    pub fn fail_with<E: Error + 'static>(&mut self, err: &E) {
        self.add_exception(err);
        self.log_error(err.to_string());
        self.mark_failed();
    }

    /// Record a recoverable lookup miss.
    pub fn not_found(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.push_exception(ExceptionChain::new("NotFound", message.clone()));
        self.log_fail(message, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentError;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_new_outcome_is_successful_and_empty() {
        let outcome = RequestOutcome::new();
        assert!(outcome.success());
        assert!(outcome.log().is_empty());
        assert!(outcome.exceptions().is_empty());
    }

    #[test]
    fn test_durations_sum_to_elapsed() {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("Op: Start");
        sleep(Duration::from_millis(5));
        outcome.log_warn("slow step");
        sleep(Duration::from_millis(3));
        outcome.log_info("Op: End");

        let last = outcome.log().last().unwrap();
        assert_eq!(
            outcome.log().total_duration_ms(),
            last.timestamp.timestamp_millis() - outcome.created_at().timestamp_millis()
        );
        assert!(outcome.log().entries()[1].duration_ms >= 5);
        assert!(outcome.log().entries()[2].duration_ms >= 3);
    }

    #[test]
    fn test_log_fail_with_flag_clears_success() {
        let mut outcome = RequestOutcome::new();
        outcome.log_fail("not there", true);
        assert!(!outcome.success());
        assert_eq!(outcome.log().last().unwrap().level, LogLevel::Fail);
    }

    #[test]
    fn test_log_fail_without_flag_keeps_success() {
        let mut outcome = RequestOutcome::new();
        outcome.log_fail("soft failure", false);
        assert!(outcome.success());
    }

    #[test]
    fn test_fail_is_never_resurrected() {
        let mut outcome = RequestOutcome::new();
        outcome.log_fail("broken", true);
        outcome.log_info("still going");
        outcome.log_warn("careful");
        outcome.log_fail("another", false);
        assert!(!outcome.success());
    }

    #[test]
    fn test_fail_with_records_exception() {
        let mut outcome = RequestOutcome::new();
        outcome.fail_with(&ContentError::Store("disk full".into()));

        assert!(!outcome.success());
        assert_eq!(outcome.exceptions().len(), 1);
        assert_eq!(outcome.exceptions()[0].kind, "ContentError");
        assert_eq!(outcome.log().last().unwrap().level, LogLevel::Error);
    }

    #[test]
    fn test_not_found_records_exception_and_fail_entry() {
        let mut outcome = RequestOutcome::new();
        outcome.not_found("Item does not exist at /missing");

        assert!(!outcome.success());
        assert_eq!(outcome.exceptions()[0].kind, "NotFound");
        assert!(outcome.log().contains("Item does not exist at /missing"));
    }

    #[test]
    fn test_entry_format() {
        let entry = LogEntry {
            timestamp: "2024-03-05T07:08:09Z".parse().unwrap(),
            duration_ms: 42,
            level: LogLevel::Warn,
            message: "hello".to_string(),
        };
        assert_eq!(entry.to_string(), "[WARN] - 2024-03-05|07:08:09|42 - hello");
    }

    #[test]
    fn test_log_renders_newline_joined() {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("one");
        outcome.log_info("two");
        let rendered = outcome.log().to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[INFO] - "));
        assert!(lines[1].ends_with(" - two"));
    }

    #[test]
    fn test_json_shape() {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("Op: Start");
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["log"][0]["level"], "Info");
        assert_eq!(value["log"][0]["message"], "Op: Start");
        assert!(value["exceptions"].as_array().unwrap().is_empty());
        assert!(value.get("created_at").is_none());

        let back: RequestOutcome = serde_json::from_value(value).unwrap();
        assert_eq!(back.log().len(), 1);
    }
}
