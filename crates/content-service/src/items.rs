//! Single-item handlers.

use chrono::Local;
use content_store::{path_under, ElevatedScope, ItemEdit, FIELD_NAVIGATION_TITLE};
use content_types::{ContentError, RequestOutcome};

use crate::service::{record_error, ContentService};
use crate::tree::{require_item, require_template};

impl ContentService {
    /// Check that an item exists.
    pub fn get_item(&self, path: &str) -> RequestOutcome {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("GetItem: Start");

        match self.store.get_item(self.source_db(), path) {
            Ok(Some(item)) => outcome.log_debug(format!("Id: {}", item.id)),
            Ok(None) => outcome.not_found(format!("Item does not exist at {path}")),
            Err(err) => record_error(&mut outcome, &err),
        }

        outcome.log_info(format!("Path: {path}"));
        outcome.log_info("GetItem: End");
        outcome
    }

    /// Create `name` under `parent_path`; `template` defaults to the article template.
    pub fn add_item(&self, name: &str, parent_path: &str, template: Option<&str>) -> RequestOutcome {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("AddItem: Start");

        let template = template.unwrap_or(self.settings.generation.article_template.as_str());
        let scope = self.store.elevate();
        let result = require_item(self.store.as_ref(), self.source_db(), parent_path)
            .and_then(|_| require_template(self.store.as_ref(), self.source_db(), template))
            .and_then(|template| {
                self.store
                    .add_item(&scope, self.source_db(), parent_path, name, &template)
            });
        if let Err(err) = result {
            record_error(&mut outcome, &err);
        }

        outcome.log_info(format!("Path: {}", path_under(parent_path, name)));
        outcome.log_info("AddItem: End");
        outcome
    }

    /// Delete an item and its descendants.
    pub fn del_item(&self, path: &str) -> RequestOutcome {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("DelItem: Start");

        let scope = self.store.elevate();
        let result = require_item(self.store.as_ref(), self.source_db(), path)
            .and_then(|_| self.store.delete_item(&scope, self.source_db(), path));
        match result {
            Ok(removed) => outcome.log_info(format!("Deleted: {removed}")),
            Err(err) => record_error(&mut outcome, &err),
        }

        outcome.log_info(format!("Path: {path}"));
        outcome.log_info("DelItem: End");
        outcome
    }

    /// Stamp the item's title and display name with the current local time.
    pub fn update_item(&self, path: &str) -> RequestOutcome {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("UpdateItem: Start");

        let scope = self.store.elevate();
        let result = require_item(self.store.as_ref(), self.source_db(), path).and_then(|item| {
            let stamped = format!("{} - {}", item.name, Local::now().format("%H:%M"));
            self.store.edit_item(
                &scope,
                self.source_db(),
                path,
                &ItemEdit::new().title(stamped.clone()).display_name(stamped),
            )
        });
        match result {
            Ok(item) => outcome.log_info(format!("Title: {}", item.display_name)),
            Err(err) => record_error(&mut outcome, &err),
        }

        outcome.log_info(format!("Path: {path}"));
        outcome.log_info("UpdateItem: End");
        outcome
    }

    /// Copy `source_path` under `parent_path` as a category named `name`.
    ///
    /// Parent defaults to the site home and source to the articles item.
    pub fn add_category(
        &self,
        name: &str,
        sort_order: i32,
        parent_path: Option<&str>,
        source_path: Option<&str>,
    ) -> RequestOutcome {
        let mut outcome = RequestOutcome::new();
        outcome.log_info("AddCategory: Start");

        let site = &self.settings.generation;
        let parent_path = parent_path.unwrap_or(site.home_path.as_str());
        let source_path = source_path.unwrap_or(site.articles_path.as_str());

        let scope = self.store.elevate();
        if let Err(err) = self.copy_category(&scope, name, sort_order, parent_path, source_path) {
            record_error(&mut outcome, &err);
        }

        outcome.log_info(format!("Path: {}", path_under(parent_path, name)));
        outcome.log_info("AddCategory: End");
        outcome
    }

    fn copy_category(
        &self,
        scope: &ElevatedScope,
        name: &str,
        sort_order: i32,
        parent_path: &str,
        source_path: &str,
    ) -> Result<(), ContentError> {
        let db = self.source_db();
        require_item(self.store.as_ref(), db, parent_path)?;
        require_item(self.store.as_ref(), db, source_path)?;

        let copy = self.store.copy_item(scope, db, source_path, parent_path, name)?;
        self.store.edit_item(
            scope,
            db,
            &copy.path,
            &ItemEdit::new()
                .title(name)
                .display_name(name)
                .sort_order(sort_order)
                .field(FIELD_NAVIGATION_TITLE, name),
        )?;
        Ok(())
    }
}
