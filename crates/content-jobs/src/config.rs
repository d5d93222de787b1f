//! Completion poller configuration.

use std::time::Duration;

use content_types::PollerSettings;
use serde::{Deserialize, Serialize};

/// Lower bound applied to the polling interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for [`CompletionPoller`](crate::CompletionPoller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Delay between status checks in milliseconds.
    /// Defaults to 1000.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Overall deadline in milliseconds; `None` waits indefinitely.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: None,
        }
    }
}

impl PollerConfig {
    pub fn with_interval_ms(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            ..Default::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Polling interval, never below [`MIN_POLL_INTERVAL`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms).max(MIN_POLL_INTERVAL)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl From<&PollerSettings> for PollerConfig {
    fn from(settings: &PollerSettings) -> Self {
        Self {
            interval_ms: settings.interval_ms,
            timeout_ms: settings.timeout_ms,
        }
    }
}
