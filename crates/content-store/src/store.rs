//! Content store interface.

use content_types::ContentError;

use crate::models::{Item, ItemEdit, Template};
use crate::privilege::ElevatedScope;

/// Hierarchical item store with one tree per database.
///
/// Reads are always allowed. Every mutation takes the caller's
/// [`ElevatedScope`] and fails with [`ContentError::AccessDenied`] unless
/// that scope came from this store's [`elevate`](ContentStore::elevate).
pub trait ContentStore: Send + Sync {
    /// Look up an item by path; `Ok(None)` when absent.
    fn get_item(&self, db: &str, path: &str) -> Result<Option<Item>, ContentError>;

    /// Look up a template by name; `Ok(None)` when absent.
    fn get_template(&self, db: &str, name: &str) -> Result<Option<Template>, ContentError>;

    /// Create `name` under `parent_path`.
    fn add_item(
        &self,
        scope: &ElevatedScope,
        db: &str,
        parent_path: &str,
        name: &str,
        template: &Template,
    ) -> Result<Item, ContentError>;

    /// Copy a single item (not its children) under a new parent with a new name and id.
    fn copy_item(
        &self,
        scope: &ElevatedScope,
        db: &str,
        source_path: &str,
        dest_parent_path: &str,
        new_name: &str,
    ) -> Result<Item, ContentError>;

    fn edit_item(
        &self,
        scope: &ElevatedScope,
        db: &str,
        path: &str,
        edit: &ItemEdit,
    ) -> Result<Item, ContentError>;

    /// Delete an item and everything below it; returns the number of items removed.
    fn delete_item(&self, scope: &ElevatedScope, db: &str, path: &str)
        -> Result<usize, ContentError>;

    /// Direct children of `path`, ordered by sort order then name.
    fn children(&self, db: &str, path: &str) -> Result<Vec<Item>, ContentError>;

    fn database_names(&self) -> Vec<String>;

    /// Issue a mutation capability for this store, valid until dropped.
    fn elevate(&self) -> ElevatedScope;
}
