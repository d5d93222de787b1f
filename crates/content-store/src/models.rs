//! Content model shared by the store, publish and index services.

use std::collections::BTreeMap;

use content_jobs::{JobState, JobStatus};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Field holding an item's title.
pub const FIELD_TITLE: &str = "title";
/// Field holding an item's navigation title.
pub const FIELD_NAVIGATION_TITLE: &str = "NavigationTitle";

/// A node in the content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    /// Absolute path, e.g. `/sitecore/content/home/articles`
    pub path: String,
    /// Template the item was created from
    pub template: String,
    pub display_name: String,
    pub sort_order: i32,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Item {
    /// Create an item named `name` under `parent_path`.
    pub fn new(parent_path: &str, name: &str, template: &str) -> Self {
        Self {
            id: Ulid::new().to_string(),
            name: name.to_string(),
            path: child_path(parent_path, name),
            template: template.to_string(),
            display_name: name.to_string(),
            sort_order: 0,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn parent_path(&self) -> Option<&str> {
        parent_path(&self.path)
    }

    /// Whether `other` lies strictly below this item.
    pub fn is_ancestor_of(&self, other: &str) -> bool {
        is_descendant(&self.path, other)
    }
}

/// A template items can be created from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Changes applied to an item in one edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEdit {
    /// Written to the `title` field
    pub title: Option<String>,
    pub display_name: Option<String>,
    pub sort_order: Option<i32>,
    /// Arbitrary field writes
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl ItemEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub(crate) fn apply(&self, item: &mut Item) {
        if let Some(title) = &self.title {
            item.fields.insert(FIELD_TITLE.to_string(), title.clone());
        }
        if let Some(display_name) = &self.display_name {
            item.display_name = display_name.clone();
        }
        if let Some(sort_order) = self.sort_order {
            item.sort_order = sort_order;
        }
        for (name, value) in &self.fields {
            item.fields.insert(name.clone(), value.clone());
        }
    }
}

/// How much of the tree below an item to publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    /// Include descendants
    pub deep: bool,
}

/// Progress of one publish operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishStatus {
    pub state: JobState,
    pub processed: u64,
    pub failed: bool,
    pub messages: Vec<String>,
}

impl From<JobStatus> for PublishStatus {
    fn from(status: JobStatus) -> Self {
        Self {
            state: status.state.unwrap_or(JobState::Queued),
            processed: status.processed,
            failed: status.is_failed(),
            messages: status
                .messages
                .into_iter()
                .chain(status.exceptions.into_iter().map(|e| e.message))
                .collect(),
        }
    }
}

/// Rebuild flags reported for a search index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRebuildStatus {
    pub rebuilding: bool,
    pub queued: bool,
    pub paused: bool,
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

impl From<&Item> for SearchHit {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            display_name: item.display_name.clone(),
        }
    }
}

/// Join a parent path and a child name.
pub fn child_path(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

/// Parent of `path`, or `None` for a root.
pub fn parent_path(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => None,
        Some(idx) => Some(&trimmed[..idx]),
    }
}

/// Whether `path` lies strictly below `ancestor`.
pub fn is_descendant(ancestor: &str, path: &str) -> bool {
    let ancestor = ancestor.trim_end_matches('/');
    path.len() > ancestor.len() + 1
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}
