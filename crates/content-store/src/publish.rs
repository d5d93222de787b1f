//! Publishing: copying items from a source database to a target database.

use std::sync::Arc;
use std::time::Duration;

use content_jobs::{JobContext, JobError, JobRegistry};
use content_types::{ContentError, Handle};
use tracing::info;

use crate::memory::InMemoryContentStore;
use crate::models::{PublishOptions, PublishStatus};
use crate::store::ContentStore;

/// Asynchronous publishing. Each call starts an operation and returns a
/// handle whose progress is read with [`get_status`](PublishService::get_status).
pub trait PublishService: Send + Sync {
    /// Publish every item that differs between source and target.
    fn publish_smart(
        &self,
        source_db: &str,
        target_db: &str,
        language: &str,
    ) -> Result<Handle, ContentError>;

    /// Publish one item, and its descendants when `options.deep` is set.
    fn publish_item(
        &self,
        source_db: &str,
        target_db: &str,
        path: &str,
        language: &str,
        options: PublishOptions,
    ) -> Result<Handle, ContentError>;

    /// Databases `source_db` can publish to.
    fn publishing_targets(&self, source_db: &str) -> Vec<String>;

    /// Current status; unknown handles fail with `InvalidHandle`.
    fn get_status(&self, handle: &Handle) -> Result<PublishStatus, ContentError>;
}

/// Finished publishes whose status stays readable by handle.
pub const DEFAULT_RETAINED_PUBLISHES: usize = 256;

/// Publisher that copies items between databases of an [`InMemoryContentStore`].
///
/// Every publish runs as its own job in a private [`JobRegistry`], keyed by
/// the handle it returns. Only the newest `retained` finished publishes keep
/// their status; older handles become unknown.
#[derive(Debug, Clone)]
pub struct InMemoryPublisher {
    store: Arc<InMemoryContentStore>,
    jobs: JobRegistry,
    step_delay: Duration,
    retained: usize,
}

impl InMemoryPublisher {
    pub fn new(store: Arc<InMemoryContentStore>) -> Self {
        Self {
            store,
            jobs: JobRegistry::new(),
            step_delay: Duration::ZERO,
            retained: DEFAULT_RETAINED_PUBLISHES,
        }
    }

    pub fn with_retained(mut self, retained: usize) -> Self {
        self.retained = retained;
        self
    }

    /// Pause after each copied item so progress can be observed.
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    fn require_database(&self, db: &str) -> Result<(), ContentError> {
        if self.store.has_database(db) {
            Ok(())
        } else {
            Err(ContentError::InvalidInput(format!("Unknown database {db}")))
        }
    }

    fn start(&self, plan: PublishPlan) -> Handle {
        let handle = Handle::generate("publish");
        let store = self.store.clone();
        let step_delay = self.step_delay;

        info!(
            handle = %handle,
            source = %plan.source_db,
            target = %plan.target_db,
            root = ?plan.root,
            "Publish started"
        );
        self.jobs.prune_terminal(self.retained);
        self.jobs.submit(handle.as_str(), 0, move |ctx| {
            plan.run(&store, &ctx, step_delay)
        });
        handle
    }
}

struct PublishPlan {
    source_db: String,
    target_db: String,
    /// `None` publishes the whole database
    root: Option<String>,
    language: String,
    options: PublishOptions,
}

impl PublishPlan {
    fn run(
        &self,
        store: &InMemoryContentStore,
        ctx: &JobContext,
        step_delay: Duration,
    ) -> Result<(), JobError> {
        let scope = store.elevate();
        let items = match &self.root {
            Some(path) => store.subtree(&self.source_db, path, self.options.deep)?,
            None => store.items(&self.source_db)?,
        };
        ctx.set_total(items.len() as u64);
        ctx.message(format!("Language: {}", self.language));

        let mut copied = 0u64;
        for item in &items {
            if store.upsert_item(&scope, &self.target_db, item)? {
                copied += 1;
            }
            ctx.advance(1);
            if !step_delay.is_zero() {
                std::thread::sleep(step_delay);
            }
        }

        let skipped = items.len() as u64 - copied;
        if self.root.is_none() {
            ctx.message(format!("Skipped {skipped} unchanged items"));
        }
        ctx.message(format!(
            "Published {copied} items to {}",
            self.target_db
        ));
        Ok(())
    }
}

impl PublishService for InMemoryPublisher {
    fn publish_smart(
        &self,
        source_db: &str,
        target_db: &str,
        language: &str,
    ) -> Result<Handle, ContentError> {
        self.require_database(source_db)?;
        self.require_database(target_db)?;
        Ok(self.start(PublishPlan {
            source_db: source_db.to_string(),
            target_db: target_db.to_string(),
            root: None,
            language: language.to_string(),
            options: PublishOptions { deep: true },
        }))
    }

    fn publish_item(
        &self,
        source_db: &str,
        target_db: &str,
        path: &str,
        language: &str,
        options: PublishOptions,
    ) -> Result<Handle, ContentError> {
        self.require_database(source_db)?;
        self.require_database(target_db)?;
        if self.store.get_item(source_db, path)?.is_none() {
            return Err(ContentError::NotFound(path.to_string()));
        }
        Ok(self.start(PublishPlan {
            source_db: source_db.to_string(),
            target_db: target_db.to_string(),
            root: Some(path.to_string()),
            language: language.to_string(),
            options,
        }))
    }

    fn publishing_targets(&self, source_db: &str) -> Vec<String> {
        self.store
            .database_names()
            .into_iter()
            .filter(|db| db != source_db)
            .collect()
    }

    fn get_status(&self, handle: &Handle) -> Result<PublishStatus, ContentError> {
        let status = self.jobs.status(handle.as_str());
        if status.state.is_none() {
            return Err(ContentError::InvalidHandle(handle.to_string()));
        }
        Ok(status.into())
    }
}
