//! Publish handlers.

use content_store::PublishOptions;
use content_types::{Handle, RequestOutcome};

use crate::service::{record_error, ContentService};

/// Language every publish is issued for.
pub const PUBLISH_LANGUAGE: &str = "en";

impl ContentService {
    /// Smart-publish the source database to `target_db` (default: the
    /// configured target). With `wait`, polls every `interval_ms` until done.
    pub async fn publish_smart(
        &self,
        wait: bool,
        interval_ms: u64,
        target_db: Option<&str>,
    ) -> RequestOutcome {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("PublishSmart: Start");

        let target = target_db.unwrap_or(self.settings.target_database.as_str());
        match self
            .publisher
            .publish_smart(self.source_db(), target, PUBLISH_LANGUAGE)
        {
            Ok(handle) => {
                outcome.log_info(format!("Handle: {handle}"));
                if wait {
                    self.wait_for_publish(&mut outcome, &handle, interval_ms).await;
                    outcome.log_info("PublishSmart: Wait");
                }
            }
            Err(err) => record_error(&mut outcome, &err),
        }

        outcome.log_info("PublishSmart: End");
        outcome
    }

    /// Publish one item, with its descendants when `deep` is set.
    pub async fn publish_item(
        &self,
        path: &str,
        deep: bool,
        wait: bool,
        interval_ms: u64,
        target_db: Option<&str>,
    ) -> RequestOutcome {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("PublishItem: Start");

        let target = target_db.unwrap_or(self.settings.target_database.as_str());
        match self.publisher.publish_item(
            self.source_db(),
            target,
            path,
            PUBLISH_LANGUAGE,
            PublishOptions { deep },
        ) {
            Ok(handle) => {
                outcome.log_info(format!("Handle: {handle}"));
                if wait {
                    self.wait_for_publish(&mut outcome, &handle, interval_ms).await;
                    outcome.log_info("PublishItem: Wait");
                }
            }
            Err(err) => record_error(&mut outcome, &err),
        }

        outcome.log_info(format!("Path: {path}"));
        outcome.log_info("PublishItem: End");
        outcome
    }

    /// Report the state of a publish started earlier.
    pub fn publish_result(&self, handle: &str) -> RequestOutcome {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("PublishResult: Start");

        let status = handle
            .parse::<Handle>()
            .and_then(|handle| self.publisher.get_status(&handle));
        match status {
            Ok(status) => {
                outcome.log_info(format!("State: {:?}", status.state));
                outcome.log_info(format!("Result: {}", status.failed));
                outcome.log_info(format!("Processed: {}", status.processed));
                outcome.log_info(format!("Messages: {}", status.messages.join(";")));
            }
            Err(err) => {
                record_error(&mut outcome, &err);
                outcome.log_info("State: null");
            }
        }

        outcome.log_info("PublishResult: End");
        outcome
    }

    async fn wait_for_publish(&self, outcome: &mut RequestOutcome, handle: &Handle, interval_ms: u64) {
        let done = self
            .poller(interval_ms)
            .wait_until_done(handle, |h| self.publisher.get_status(h).map(|s| s.state))
            .await;

        match done.and_then(|done| Ok((done, self.publisher.get_status(handle)?))) {
            Ok((false, _)) => outcome.log_fail(format!("Publish {handle} did not complete"), true),
            Ok((true, status)) if status.failed => {
                outcome.log_fail(format!("Publish {handle} failed"), true);
                for message in status.messages {
                    outcome.log_info(message);
                }
            }
            Ok((true, status)) => outcome.log_info(format!("Processed: {}", status.processed)),
            Err(err) => record_error(outcome, &err),
        }
    }
}
