//! Search indexes over content databases.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use content_jobs::{JobRegistry, JobState};
use content_types::{ContentError, Handle, Settings};
use tracing::info;

use crate::memory::InMemoryContentStore;
use crate::models::{IndexRebuildStatus, SearchHit};

/// Named search indexes with asynchronous full rebuilds.
pub trait IndexService: Send + Sync {
    fn index_names(&self) -> Vec<String>;

    /// Queue a full rebuild of `index`.
    fn rebuild(&self, index: &str) -> Result<Handle, ContentError>;

    fn rebuild_status(&self, index: &str) -> Result<IndexRebuildStatus, ContentError>;

    fn is_rebuilding(&self, index: &str) -> Result<bool, ContentError> {
        Ok(self.rebuild_status(index)?.rebuilding)
    }

    fn is_queued(&self, index: &str) -> Result<bool, ContentError> {
        Ok(self.rebuild_status(index)?.queued)
    }

    fn is_paused(&self, index: &str) -> Result<bool, ContentError> {
        Ok(self.rebuild_status(index)?.paused)
    }

    /// Items whose name contains `text` (case-sensitive).
    fn search(&self, index: &str, text: &str) -> Result<Vec<SearchHit>, ContentError>;
}

#[derive(Debug)]
struct IndexData {
    database: String,
    documents: Vec<SearchHit>,
    paused: bool,
    /// Handle of the most recently accepted rebuild
    last_rebuild: Option<Handle>,
}

type IndexMap = Arc<RwLock<BTreeMap<String, IndexData>>>;

/// Index that snapshots item names from an [`InMemoryContentStore`] database.
///
/// Rebuilds run as jobs named `rebuild:<index>`, so at most one rebuild per
/// index is in flight. Requesting a rebuild while one is active returns the
/// active rebuild's handle.
#[derive(Debug, Clone)]
pub struct InMemorySearchIndex {
    store: Arc<InMemoryContentStore>,
    indexes: IndexMap,
    jobs: JobRegistry,
    step_delay: Duration,
}

impl InMemorySearchIndex {
    pub fn new(store: Arc<InMemoryContentStore>) -> Self {
        Self {
            store,
            indexes: Arc::default(),
            jobs: JobRegistry::new(),
            step_delay: Duration::ZERO,
        }
    }

    /// Master and web indexes over the configured source and target databases.
    pub fn with_default_indexes(
        store: Arc<InMemoryContentStore>,
        settings: &Settings,
    ) -> Result<Self, ContentError> {
        let index = Self::new(store);
        index.add_index(&settings.default_index, &settings.source_database)?;
        index.add_index(
            &format!("sitecore_{}_index", settings.target_database),
            &settings.target_database,
        )?;
        Ok(index)
    }

    /// Pause after each indexed item so progress can be observed.
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    /// Register `name` over `database` and build it immediately.
    pub fn add_index(&self, name: &str, database: &str) -> Result<(), ContentError> {
        let documents = snapshot(&self.store, database)?;
        self.write().insert(
            name.to_string(),
            IndexData {
                database: database.to_string(),
                documents,
                paused: false,
                last_rebuild: None,
            },
        );
        Ok(())
    }

    pub fn set_paused(&self, index: &str, paused: bool) -> Result<(), ContentError> {
        let mut indexes = self.write();
        let data = indexes.get_mut(index).ok_or_else(|| unknown_index(index))?;
        data.paused = paused;
        Ok(())
    }

    fn job_name(index: &str) -> String {
        format!("rebuild:{index}")
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, IndexData>> {
        self.indexes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, IndexData>> {
        self.indexes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unknown_index(index: &str) -> ContentError {
    ContentError::InvalidInput(format!("Unknown index {index}"))
}

fn snapshot(store: &InMemoryContentStore, database: &str) -> Result<Vec<SearchHit>, ContentError> {
    Ok(store.items(database)?.iter().map(SearchHit::from).collect())
}

impl IndexService for InMemorySearchIndex {
    fn index_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    fn rebuild(&self, index: &str) -> Result<Handle, ContentError> {
        // Held across submission so the recorded handle matches the accepted run.
        let mut guard = self.write();
        let data = guard.get_mut(index).ok_or_else(|| unknown_index(index))?;
        let database = data.database.clone();

        let handle = Handle::generate(index);
        let store = self.store.clone();
        let indexes = self.indexes.clone();
        let name = index.to_string();
        let step_delay = self.step_delay;

        let submission = self.jobs.submit(&Self::job_name(index), 0, move |ctx| {
            let items = store.items(&database)?;
            ctx.set_total(items.len() as u64);

            let mut documents = Vec::with_capacity(items.len());
            for item in &items {
                documents.push(SearchHit::from(item));
                ctx.advance(1);
                if !step_delay.is_zero() {
                    std::thread::sleep(step_delay);
                }
            }

            let count = documents.len();
            let mut indexes = indexes.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(data) = indexes.get_mut(&name) {
                data.documents = documents;
            }
            ctx.message(format!("Indexed {count} items"));
            Ok(())
        });

        let handle = if submission.is_accepted() {
            data.last_rebuild = Some(handle.clone());
            handle
        } else {
            data.last_rebuild.clone().unwrap_or(handle)
        };
        info!(
            index,
            handle = %handle,
            accepted = submission.is_accepted(),
            state = ?submission.status().state,
            "Index rebuild requested"
        );
        Ok(handle)
    }

    fn rebuild_status(&self, index: &str) -> Result<IndexRebuildStatus, ContentError> {
        let paused = self
            .read()
            .get(index)
            .map(|data| data.paused)
            .ok_or_else(|| unknown_index(index))?;
        let status = self.jobs.status(&Self::job_name(index));
        Ok(IndexRebuildStatus {
            rebuilding: status.state == Some(JobState::Running),
            queued: status.state == Some(JobState::Queued),
            paused,
        })
    }

    fn search(&self, index: &str, text: &str) -> Result<Vec<SearchHit>, ContentError> {
        let indexes = self.read();
        let data = indexes.get(index).ok_or_else(|| unknown_index(index))?;
        Ok(data
            .documents
            .iter()
            .filter(|doc| doc.name.contains(text))
            .cloned()
            .collect())
    }
}
