//! Bulk content generation handlers.

use content_jobs::{JobError, JobState, JobStatus, Submission};
use content_types::{ContentError, Handle, RequestOutcome};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use content_store::path_under;

use crate::service::{record_error, ContentService};
use crate::tree::{create_article_tree, create_folder_tree, ArticleSettings, FolderSettings};

/// Result of submitting a generation job: the request envelope plus the
/// job status observed right after submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSubmission {
    pub outcome: RequestOutcome,
    pub job: JobStatus,
}

impl ContentService {
    /// Generate an article tree inline.
    pub fn add_article(&self, article: &ArticleSettings) -> RequestOutcome {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("AddArticle: Start");

        let scope = self.store.elevate();
        let mut created = 0u64;
        match create_article_tree(
            self.store.as_ref(),
            &scope,
            self.source_db(),
            &self.settings.generation,
            article,
            &mut |_| created += 1,
        ) {
            Ok(top) => {
                outcome.log_info(format!("Path: {}", top.path));
                outcome.log_info(format!("Created: {created}"));
            }
            Err(err) => record_error(&mut outcome, &err),
        }

        outcome.log_info("AddArticle: End");
        outcome
    }

    /// Generate an article tree in the background under the configured job
    /// slot. Only one generation runs at a time; a submission made while
    /// one is active leaves it untouched and reports its status.
    pub fn add_article_as_job(&self, article: &ArticleSettings) -> JobSubmission {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("AddArticleAsJob: Start");

        let (job, _) = self.submit_generation(&mut outcome, article);

        outcome.log_info("AddArticleAsJob: End");
        JobSubmission { outcome, job }
    }

    /// Submit the generation job and poll its slot every `interval_ms`
    /// until the run this call started is terminal.
    ///
    /// When another generation is already active nothing is awaited. A
    /// timeout, a failed run or a poll error clears `success`.
    pub async fn add_article_as_job_and_wait(
        &self,
        article: &ArticleSettings,
        interval_ms: u64,
    ) -> JobSubmission {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("AddArticleAsJobAndWait: Start");

        let (mut job, started) = self.submit_generation(&mut outcome, article);
        if started {
            let slot = Handle::generate(&job.name);
            let done = self
                .poller(interval_ms)
                .wait_until_done(&slot, |_| {
                    // an unknown slot cannot progress
                    Ok::<_, ContentError>(self.generation_status().state.unwrap_or(JobState::Failed))
                })
                .await;
            job = self.generation_status();

            match done {
                Ok(true) if job.is_failed() => {
                    for exception in &job.exceptions {
                        outcome.push_exception(exception.clone());
                    }
                    outcome.log_fail(format!("Job {} failed", job.name), true);
                }
                Ok(true) => {
                    info!(job = %job.name, processed = job.processed, "Generation job finished");
                    outcome.log_info(format!("Processed: {}", job.processed));
                }
                Ok(false) => {
                    outcome.log_fail(format!("Job {} did not finish in time", job.name), true)
                }
                Err(err) => record_error(&mut outcome, &err),
            }
        }

        outcome.log_info("AddArticleAsJobAndWait: End");
        JobSubmission { outcome, job }
    }

    /// Validate and submit the generation job, logging the result on
    /// `outcome`. The flag is true only when this call started a run.
    fn submit_generation(
        &self,
        outcome: &mut RequestOutcome,
        article: &ArticleSettings,
    ) -> (JobStatus, bool) {
        if let Err(err) = article.validate() {
            record_error(outcome, &err);
            return (self.generation_status(), false);
        }

        let job_name = self.settings.generation.job_name.clone();
        let store = self.store.clone();
        let settings = self.settings.clone();
        let db = self.settings.source_database.clone();
        let work_article = article.clone();

        let submission = self
            .jobs
            .submit(&job_name, article.item_count(), move |ctx| {
                let scope = store.elevate();
                let top = create_article_tree(
                    store.as_ref(),
                    &scope,
                    &db,
                    &settings.generation,
                    &work_article,
                    &mut |_| ctx.advance(1),
                )
                .map_err(JobError::from)?;
                ctx.message(format!("Path: {}", top.path));
                Ok(())
            });

        match submission {
            Submission::AlreadyActive(job) => {
                warn!(job = %job_name, "Generation already in progress");
                outcome.log_warn(format!("Job {job_name} is already running"));
                (job, false)
            }
            Submission::Accepted(job) if job.is_failed() => {
                for exception in &job.exceptions {
                    outcome.push_exception(exception.clone());
                }
                outcome.log_fail(format!("Job {job_name} could not be started"), true);
                (job, false)
            }
            Submission::Accepted(job) => {
                outcome.log_info(format!("Job: {job_name}"));
                (job, true)
            }
        }
    }

    /// Status of the generation job slot.
    pub fn generation_status(&self) -> JobStatus {
        self.jobs.status(&self.settings.generation.job_name)
    }

    /// Delete the `Top_<prefix>` tree under the home item.
    pub fn del_article(&self, page_prefix: &str) -> RequestOutcome {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("DelArticle: Start");

        let path = path_under(&self.settings.generation.home_path, &format!("Top_{page_prefix}"));
        let scope = self.store.elevate();
        match self.store.get_item(self.source_db(), &path) {
            Ok(Some(_)) => match self.store.delete_item(&scope, self.source_db(), &path) {
                Ok(removed) => outcome.log_info(format!("Deleted: {removed}")),
                Err(err) => record_error(&mut outcome, &err),
            },
            Ok(None) => outcome.not_found(format!("Article does not exist at {path}")),
            Err(err) => record_error(&mut outcome, &err),
        }

        outcome.log_info("DelArticle: End");
        outcome
    }

    /// Generate a folder-rooted tree inline.
    pub fn add_folder_of_items(&self, folder: &FolderSettings) -> RequestOutcome {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("AddFolderOfItems: Start");

        let scope = self.store.elevate();
        let mut created = 0u64;
        match create_folder_tree(
            self.store.as_ref(),
            &scope,
            self.source_db(),
            &self.settings.generation,
            folder,
            &mut |_| created += 1,
        ) {
            Ok(top) => {
                outcome.log_info(format!("Path: {}", top.path));
                outcome.log_info(format!("Created: {created}"));
            }
            Err(err) => record_error(&mut outcome, &err),
        }

        outcome.log_info("AddFolderOfItems: End");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use content_jobs::{JobRegistry, JobState};
    use content_store::{
        ContentStore, ElevatedScope, InMemoryContentStore, InMemoryPublisher,
        InMemorySearchIndex, Item, ItemEdit, Template,
    };
    use content_types::Settings;

    use super::*;
    use crate::service::test_support::{assert_bracketed, messages, service};

    async fn wait_generation(service: &ContentService) -> JobStatus {
        for _ in 0..500 {
            let status = service.generation_status();
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("generation job never finished");
    }

    #[test]
    fn test_add_article() {
        let service = service();
        let outcome = service.add_article(&ArticleSettings::new("perf", 2).with_depth(2));

        assert!(outcome.success());
        assert_bracketed(&outcome, "AddArticle");
        assert!(outcome.log().contains("Created: 7"));

        let home = &service.settings().generation.home_path;
        let leaf = format!("{home}/Top_perf/perf_2/perf_2_1");
        assert!(service.store().get_item("master", &leaf).unwrap().is_some());
    }

    #[test]
    fn test_add_article_twice_reports_existing_item() {
        let service = service();
        assert!(service.add_article(&ArticleSettings::new("dup", 1)).success());

        let outcome = service.add_article(&ArticleSettings::new("dup", 1));
        assert!(!outcome.success());
        assert_eq!(outcome.exceptions().len(), 1);
        assert_bracketed(&outcome, "AddArticle");
    }

    fn service_over(store: Arc<InMemoryContentStore>, settings: Settings) -> ContentService {
        let publisher = InMemoryPublisher::new(store.clone());
        let index = InMemorySearchIndex::with_default_indexes(store.clone(), &settings).unwrap();
        ContentService::new(
            store,
            Arc::new(publisher),
            Arc::new(index),
            JobRegistry::new(),
            settings,
        )
    }

    #[test]
    fn test_add_article_releases_elevation() {
        let settings = Settings::default();
        let store = Arc::new(InMemoryContentStore::with_site(&settings));
        let service = service_over(store.clone(), settings);

        let outcome = service.add_article(&ArticleSettings::new("", 1));
        assert!(!outcome.success());
        assert_eq!(store.open_scopes(), 0);

        assert!(service.add_article(&ArticleSettings::new("ok", 1)).success());
        assert_eq!(store.open_scopes(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_article_as_job() {
        let service = service();
        let article = ArticleSettings::new("job", 3).with_depth(2);

        let submission = service.add_article_as_job(&article);
        assert!(submission.outcome.success());
        assert_bracketed(&submission.outcome, "AddArticleAsJob");
        assert_eq!(submission.job.total, article.item_count());

        let status = wait_generation(&service).await;
        assert_eq!(status.state, Some(JobState::Finished));
        assert_eq!(status.processed, 13);
        assert_eq!(status.percent_complete, 100);
        assert!(!status.job_running);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_article_as_job_failure_is_recorded() {
        let service = service();
        assert!(service.add_article(&ArticleSettings::new("clash", 1)).success());

        let submission = service.add_article_as_job(&ArticleSettings::new("clash", 1));
        assert!(submission.outcome.success());

        let status = wait_generation(&service).await;
        assert_eq!(status.state, Some(JobState::Failed));
        assert_eq!(status.exceptions.len(), 1);

        // slot is free again after a failure
        let again = service.add_article_as_job(&ArticleSettings::new("fresh", 1));
        assert_ne!(again.job.state, Some(JobState::Failed));
        assert_eq!(wait_generation(&service).await.state, Some(JobState::Finished));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_article_as_job_while_slot_busy() {
        let service = service();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let blocker = service.jobs().submit("PerformanceGeneration", 1, move |_| {
            let _ = release_rx.recv();
            Ok(())
        });
        assert!(blocker.is_accepted());

        let submission = service.add_article_as_job(&ArticleSettings::new("late", 1));
        assert!(submission.outcome.success());
        assert_bracketed(&submission.outcome, "AddArticleAsJob");
        let logged = messages(&submission.outcome);
        assert!(logged.contains(&"Job PerformanceGeneration is already running".to_string()));
        assert!(!logged.contains(&"Job: PerformanceGeneration".to_string()));
        assert_eq!(submission.job.submitted_at, blocker.status().submitted_at);

        release_tx.send(()).unwrap();
        wait_generation(&service).await;
        let home = &service.settings().generation.home_path;
        assert!(service
            .store()
            .get_item("master", &format!("{home}/Top_late"))
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_article_as_job_and_wait() {
        let service = service();
        let article = ArticleSettings::new("waited", 2).with_depth(2);

        let submission = service.add_article_as_job_and_wait(&article, 5).await;
        assert!(submission.outcome.success());
        assert_bracketed(&submission.outcome, "AddArticleAsJobAndWait");
        assert!(submission.outcome.log().contains("Processed: 7"));
        assert_eq!(submission.job.state, Some(JobState::Finished));
        assert_eq!(submission.job.percent_complete, 100);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_article_as_job_and_wait_failure_stays_bracketed() {
        let service = service();
        assert!(service.add_article(&ArticleSettings::new("clash", 1)).success());

        let submission = service
            .add_article_as_job_and_wait(&ArticleSettings::new("clash", 1), 5)
            .await;
        assert!(!submission.outcome.success());
        assert_bracketed(&submission.outcome, "AddArticleAsJobAndWait");
        assert!(submission.outcome.log().contains("Job PerformanceGeneration failed"));
        assert_eq!(submission.outcome.exceptions().len(), 1);
        assert!(submission.job.is_failed());
    }

    /// Delegates to an in-memory store, pausing on every `add_item`.
    struct SlowStore {
        inner: InMemoryContentStore,
        delay: Duration,
    }

    impl ContentStore for SlowStore {
        fn get_item(&self, db: &str, path: &str) -> Result<Option<Item>, ContentError> {
            self.inner.get_item(db, path)
        }

        fn get_template(&self, db: &str, name: &str) -> Result<Option<Template>, ContentError> {
            self.inner.get_template(db, name)
        }

        fn add_item(
            &self,
            scope: &ElevatedScope,
            db: &str,
            parent_path: &str,
            name: &str,
            template: &Template,
        ) -> Result<Item, ContentError> {
            std::thread::sleep(self.delay);
            self.inner.add_item(scope, db, parent_path, name, template)
        }

        fn copy_item(
            &self,
            scope: &ElevatedScope,
            db: &str,
            source_path: &str,
            dest_parent_path: &str,
            new_name: &str,
        ) -> Result<Item, ContentError> {
            self.inner.copy_item(scope, db, source_path, dest_parent_path, new_name)
        }

        fn edit_item(
            &self,
            scope: &ElevatedScope,
            db: &str,
            path: &str,
            edit: &ItemEdit,
        ) -> Result<Item, ContentError> {
            self.inner.edit_item(scope, db, path, edit)
        }

        fn delete_item(
            &self,
            scope: &ElevatedScope,
            db: &str,
            path: &str,
        ) -> Result<usize, ContentError> {
            self.inner.delete_item(scope, db, path)
        }

        fn children(&self, db: &str, path: &str) -> Result<Vec<Item>, ContentError> {
            self.inner.children(db, path)
        }

        fn database_names(&self) -> Vec<String> {
            self.inner.database_names()
        }

        fn elevate(&self) -> ElevatedScope {
            self.inner.elevate()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_article_as_job_and_wait_timeout_clears_success() {
        let mut settings = Settings::default();
        settings.poller.timeout_ms = Some(20);
        let indexed = Arc::new(InMemoryContentStore::with_site(&settings));
        let slow = Arc::new(SlowStore {
            inner: InMemoryContentStore::with_site(&settings),
            delay: Duration::from_millis(80),
        });
        let service = ContentService::new(
            slow,
            Arc::new(InMemoryPublisher::new(indexed.clone())),
            Arc::new(InMemorySearchIndex::with_default_indexes(indexed, &settings).unwrap()),
            JobRegistry::new(),
            settings,
        );

        let submission = service
            .add_article_as_job_and_wait(&ArticleSettings::new("slow", 1), 5)
            .await;
        assert!(!submission.outcome.success());
        assert_bracketed(&submission.outcome, "AddArticleAsJobAndWait");
        assert!(submission
            .outcome
            .log()
            .contains("Job PerformanceGeneration did not finish in time"));
        assert!(submission.job.job_running);

        assert_eq!(wait_generation(&service).await.state, Some(JobState::Finished));
    }

    #[test]
    fn test_add_article_as_job_without_runtime() {
        let service = service();
        let submission = service.add_article_as_job(&ArticleSettings::new("nort", 1));

        assert!(!submission.outcome.success());
        assert_eq!(submission.job.state, Some(JobState::Failed));
        assert_bracketed(&submission.outcome, "AddArticleAsJob");
    }

    #[test]
    fn test_generation_status_before_any_job() {
        let service = service();
        let status = service.generation_status();
        assert_eq!(status.name, "PerformanceGeneration");
        assert_eq!(status.state, None);
    }

    #[test]
    fn test_del_article() {
        let service = service();
        assert!(service.add_article(&ArticleSettings::new("gone", 2)).success());

        let outcome = service.del_article("gone");
        assert!(outcome.success());
        assert!(outcome.log().contains("Deleted: 3"));

        let outcome = service.del_article("gone");
        assert!(!outcome.success());
        assert_bracketed(&outcome, "DelArticle");
        assert!(messages(&outcome)
            .iter()
            .any(|m| m.starts_with("Article does not exist at ")));
    }

    #[test]
    fn test_add_folder_of_items() {
        let service = service();
        let folder = FolderSettings {
            parent_path: service.settings().generation.home_path.clone(),
            template_name: service.settings().generation.article_template.clone(),
            page_prefix: "bulk".to_string(),
            num_items: 3,
            depth: 1,
            sort_order: 2,
        };

        let outcome = service.add_folder_of_items(&folder);
        assert!(outcome.success());
        assert!(outcome.log().contains("Created: 4"));
        assert_bracketed(&outcome, "AddFolderOfItems");
    }

    #[test]
    fn test_add_folder_missing_parent() {
        let service = service();
        let folder = FolderSettings {
            parent_path: "/sitecore/content/none".to_string(),
            template_name: service.settings().generation.article_template.clone(),
            page_prefix: "bulk".to_string(),
            num_items: 1,
            depth: 1,
            sort_order: 1,
        };

        let outcome = service.add_folder_of_items(&folder);
        assert!(!outcome.success());
        assert_eq!(outcome.exceptions()[0].kind, "NotFound");
    }
}
