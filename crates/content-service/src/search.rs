//! Search index handlers.

use chrono::{DateTime, Utc};
use content_jobs::JobState;
use content_store::{IndexRebuildStatus, SearchHit};
use content_types::Handle;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::service::ContentService;

/// Outcome of an index rebuild request or status check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRebuild {
    pub success: bool,
    pub rebuilding: bool,
    pub queued: bool,
    pub paused: bool,
    pub handle: Option<String>,
    pub message: String,
    pub event_time: DateTime<Utc>,
}

impl IndexRebuild {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            rebuilding: false,
            queued: false,
            paused: false,
            handle: None,
            message: message.into(),
            event_time: Utc::now(),
        }
    }

    fn from_status(handle: &str, status: IndexRebuildStatus) -> Self {
        let message = if status.rebuilding || status.queued {
            "Rebuild InProgress"
        } else {
            "Rebuild Complete"
        };
        Self {
            success: true,
            rebuilding: status.rebuilding,
            queued: status.queued,
            paused: status.paused,
            handle: Some(handle.to_string()),
            message: message.to_string(),
            event_time: Utc::now(),
        }
    }
}

/// Items matched by an index search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchHit>,
    pub message: String,
    pub index_name: Option<String>,
    pub search_text: Option<String>,
}

fn rebuild_state(status: &IndexRebuildStatus) -> JobState {
    if status.queued {
        JobState::Queued
    } else if status.rebuilding {
        JobState::Running
    } else {
        JobState::Finished
    }
}

impl ContentService {
    /// Queue a full rebuild of `index`.
    pub fn index_rebuild(&self, index: &str) -> IndexRebuild {
        if index.trim().is_empty() {
            return IndexRebuild::failed("Index Name was not specified");
        }
        match self.index.rebuild(index) {
            Ok(handle) => IndexRebuild {
                success: true,
                rebuilding: true,
                queued: false,
                paused: false,
                handle: Some(handle.to_string()),
                message: "Indexing Job Submitted".to_string(),
                event_time: Utc::now(),
            },
            Err(err) => IndexRebuild::failed(err.to_string()),
        }
    }

    /// Rebuild flags for `index`; `handle` must name a rebuild job.
    pub fn index_rebuild_status(&self, handle: &str, index: &str) -> IndexRebuild {
        if handle.trim().is_empty() {
            return IndexRebuild::failed("Job handle was not specified");
        }
        if index.trim().is_empty() {
            return IndexRebuild::failed("Index Name was not specified");
        }
        if handle.parse::<Handle>().is_err() {
            return IndexRebuild::failed("Handle specified could not be identified as a Job.");
        }
        match self.index.rebuild_status(index) {
            Ok(status) => IndexRebuild::from_status(handle, status),
            Err(err) => IndexRebuild::failed(err.to_string()),
        }
    }

    /// Start a rebuild and poll every `interval_ms` until it is no longer
    /// queued or rebuilding.
    pub async fn index_rebuild_and_wait(&self, index: &str, interval_ms: u64) -> IndexRebuild {
        let submitted = self.index_rebuild(index);
        let Some(raw) = submitted.handle.clone() else {
            return submitted;
        };
        let handle: Handle = match raw.parse() {
            Ok(handle) => handle,
            Err(err) => return IndexRebuild::failed(err.to_string()),
        };

        let done = self
            .poller(interval_ms)
            .wait_until_done(&handle, |_| {
                self.index.rebuild_status(index).map(|s| rebuild_state(&s))
            })
            .await;

        match done {
            Ok(true) => self.index_rebuild_status(handle.as_str(), index),
            Ok(false) => {
                let mut result = self.index_rebuild_status(handle.as_str(), index);
                result.success = false;
                result.message = "Rebuild did not complete".to_string();
                result
            }
            Err(err) => IndexRebuild::failed(err.to_string()),
        }
    }

    /// Items in `index` whose name contains `text`.
    pub fn item_search(&self, text: &str, index: Option<&str>) -> SearchResults {
        if text.is_empty() {
            return SearchResults {
                message: "search parameter not specified.".to_string(),
                ..SearchResults::default()
            };
        }
        let index = index.unwrap_or(self.settings.default_index.as_str());
        match self.index.search(index, text) {
            Ok(results) => {
                debug!(index, text, hits = results.len(), "Search completed");
                SearchResults {
                    results,
                    message: "search completed".to_string(),
                    index_name: Some(index.to_string()),
                    search_text: Some(text.to_string()),
                }
            }
            Err(err) => SearchResults {
                message: err.to_string(),
                index_name: Some(index.to_string()),
                search_text: Some(text.to_string()),
                ..SearchResults::default()
            },
        }
    }

    pub fn list_indexes(&self) -> Vec<String> {
        self.index.index_names()
    }
}
