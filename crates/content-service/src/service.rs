//! The `ContentService` handler bundle.

use std::sync::Arc;

use content_jobs::{CompletionPoller, JobRegistry, PollerConfig};
use content_store::{
    ContentStore, InMemoryContentStore, InMemoryPublisher, InMemorySearchIndex, IndexService,
    PublishService,
};
use content_types::{ContentError, ExceptionChain, RequestOutcome, Settings};

/// Operation handlers over a content store, publisher and search index.
///
/// Handlers never return errors: every failure ends up in the envelope they
/// return. Cloning is cheap; clones share backends and the job registry.
#[derive(Clone)]
pub struct ContentService {
    pub(crate) store: Arc<dyn ContentStore>,
    pub(crate) publisher: Arc<dyn PublishService>,
    pub(crate) index: Arc<dyn IndexService>,
    pub(crate) jobs: JobRegistry,
    pub(crate) settings: Arc<Settings>,
}

impl ContentService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        publisher: Arc<dyn PublishService>,
        index: Arc<dyn IndexService>,
        jobs: JobRegistry,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            publisher,
            index,
            jobs,
            settings: Arc::new(settings),
        }
    }

    /// Service over freshly seeded in-memory backends.
    pub fn in_memory(settings: Settings) -> Result<Self, ContentError> {
        let store = Arc::new(InMemoryContentStore::with_site(&settings));
        let publisher = InMemoryPublisher::new(store.clone());
        let index = InMemorySearchIndex::with_default_indexes(store.clone(), &settings)?;
        Ok(Self::new(
            store,
            Arc::new(publisher),
            Arc::new(index),
            JobRegistry::new(),
            settings,
        ))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    pub fn publisher(&self) -> &Arc<dyn PublishService> {
        &self.publisher
    }

    pub fn index(&self) -> &Arc<dyn IndexService> {
        &self.index
    }

    pub(crate) fn source_db(&self) -> &str {
        &self.settings.source_database
    }

    /// Poller for a blocking "wait" variant using `interval_ms` and the configured timeout.
    pub(crate) fn poller(&self, interval_ms: u64) -> CompletionPoller {
        CompletionPoller::new(PollerConfig {
            interval_ms,
            timeout_ms: self.settings.poller.timeout_ms,
        })
    }
}

/// Record a content error on an outcome.
///
/// Lookup misses are expected: they get a synthesized exception and a Fail
/// entry. Anything else is captured with its cause chain and logged at Error.
pub(crate) fn record_error(outcome: &mut RequestOutcome, err: &ContentError) {
    if err.is_not_found() {
        outcome.push_exception(ExceptionChain::new("NotFound", err.to_string()));
        outcome.log_fail(err.to_string(), true);
    } else {
        outcome.fail_with(err);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_not_found() {
        let mut outcome = RequestOutcome::new();
        record_error(&mut outcome, &ContentError::NotFound("/x".to_string()));

        assert!(!outcome.success());
        assert_eq!(outcome.exceptions()[0].kind, "NotFound");
        assert!(outcome.log().contains("Item does not exist at /x"));
    }

    #[test]
    fn test_record_unexpected() {
        let mut outcome = RequestOutcome::new();
        record_error(&mut outcome, &ContentError::Store("disk".to_string()));

        assert!(!outcome.success());
        assert_eq!(outcome.exceptions()[0].kind, "ContentError");
    }

    #[test]
    fn test_in_memory_service() {
        let service = test_support::service();
        assert_eq!(service.source_db(), "master");
        assert_eq!(service.store().database_names(), vec!["master", "web"]);
        assert_eq!(service.index().index_names().len(), 2);
    }
}
