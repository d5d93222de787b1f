//! N-ary content tree generation.
//!
//! Below a top item, every node at depth `k < d` gets `n` children named
//! `<parent prefix>_<i>` for `i` in `1..=n`, giving `n + n² + … + nᵈ` items.

use content_types::{ContentError, GenerationSettings};
use serde::{Deserialize, Serialize};

use content_store::{
    path_under, ContentStore, ElevatedScope, Item, ItemEdit, Template, FIELD_NAVIGATION_TITLE,
};

/// Parameters for an article tree under the site home item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSettings {
    pub page_prefix: String,
    pub num_items: u32,
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default = "default_sort_order")]
    pub sort_order: i32,
}

/// Parameters for a folder-rooted tree under an arbitrary parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSettings {
    pub parent_path: String,
    pub template_name: String,
    pub page_prefix: String,
    pub num_items: u32,
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default = "default_sort_order")]
    pub sort_order: i32,
}

fn default_depth() -> u32 {
    1
}

fn default_sort_order() -> i32 {
    1
}

impl ArticleSettings {
    pub fn new(page_prefix: impl Into<String>, num_items: u32) -> Self {
        Self {
            page_prefix: page_prefix.into(),
            num_items,
            depth: default_depth(),
            sort_order: default_sort_order(),
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn top_name(&self) -> String {
        format!("Top_{}", self.page_prefix)
    }

    /// Items the generator creates, the top item included.
    pub fn item_count(&self) -> u64 {
        tree_size(u64::from(self.num_items), self.depth).saturating_add(1)
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        validate_prefix(&self.page_prefix)
    }
}

impl FolderSettings {
    pub fn folder_name(&self) -> String {
        format!("{}Folder", self.page_prefix)
    }

    /// Items the generator creates, the folder included.
    pub fn item_count(&self) -> u64 {
        tree_size(u64::from(self.num_items), self.depth).saturating_add(1)
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        validate_prefix(&self.page_prefix)?;
        if self.template_name.trim().is_empty() {
            return Err(ContentError::InvalidInput(
                "template name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_prefix(prefix: &str) -> Result<(), ContentError> {
    if prefix.trim().is_empty() {
        return Err(ContentError::InvalidInput(
            "page prefix must not be empty".to_string(),
        ));
    }
    if prefix.contains('/') {
        return Err(ContentError::InvalidInput(format!(
            "page prefix must not contain '/': {prefix}"
        )));
    }
    Ok(())
}

/// `n + n² + … + nᵈ`, saturating at `u64::MAX`.
pub fn tree_size(num_items: u64, depth: u32) -> u64 {
    let mut total: u64 = 0;
    let mut level: u64 = 1;
    for _ in 0..depth {
        level = level.saturating_mul(num_items);
        total = total.saturating_add(level);
    }
    total
}

/// Build `depth` levels of `num_items` children below `parent`.
///
/// `on_item` is called once per created item. Returns the number created.
#[allow(clippy::too_many_arguments)]
pub fn create_items(
    store: &dyn ContentStore,
    scope: &ElevatedScope,
    db: &str,
    parent: &Item,
    template: &Template,
    prefix: &str,
    depth: u32,
    num_items: u32,
    on_item: &mut dyn FnMut(&Item),
) -> Result<u64, ContentError> {
    if depth == 0 {
        return Ok(0);
    }
    let mut created = 0;
    for i in 1..=num_items {
        let name = format!("{prefix}_{i}");
        let child = store.add_item(scope, db, &parent.path, &name, template)?;
        on_item(&child);
        created += 1;
        created += create_items(
            store,
            scope,
            db,
            &child,
            template,
            &name,
            depth - 1,
            num_items,
            on_item,
        )?;
    }
    Ok(created)
}

/// Copy the articles item under home as `Top_<prefix>` and grow the tree below it.
///
/// `scope` must come from `store`. Returns the top item.
pub fn create_article_tree(
    store: &dyn ContentStore,
    scope: &ElevatedScope,
    db: &str,
    site: &GenerationSettings,
    article: &ArticleSettings,
    on_item: &mut dyn FnMut(&Item),
) -> Result<Item, ContentError> {
    article.validate()?;
    require_item(store, db, &site.home_path)?;
    require_item(store, db, &site.articles_path)?;
    let template = require_template(store, db, &site.article_template)?;

    let top_name = article.top_name();
    store.copy_item(scope, db, &site.articles_path, &site.home_path, &top_name)?;
    let top = store.edit_item(
        scope,
        db,
        &path_under(&site.home_path, &top_name),
        &ItemEdit::new()
            .title(top_name.clone())
            .display_name(top_name.clone())
            .sort_order(article.sort_order)
            .field(FIELD_NAVIGATION_TITLE, top_name.clone()),
    )?;
    on_item(&top);

    create_items(
        store,
        scope,
        db,
        &top,
        &template,
        &article.page_prefix,
        article.depth,
        article.num_items,
        on_item,
    )?;
    Ok(top)
}

/// Add `<prefix>Folder` under the parent and grow the tree below it.
///
/// `scope` must come from `store`. Returns the folder item.
pub fn create_folder_tree(
    store: &dyn ContentStore,
    scope: &ElevatedScope,
    db: &str,
    site: &GenerationSettings,
    folder: &FolderSettings,
    on_item: &mut dyn FnMut(&Item),
) -> Result<Item, ContentError> {
    folder.validate()?;
    let parent = require_item(store, db, &folder.parent_path)?;
    let folder_template = require_template(store, db, &site.folder_template)?;
    let item_template = require_template(store, db, &folder.template_name)?;

    let top = store.add_item(scope, db, &parent.path, &folder.folder_name(), &folder_template)?;
    let top = store.edit_item(
        scope,
        db,
        &top.path,
        &ItemEdit::new().sort_order(folder.sort_order),
    )?;
    on_item(&top);

    create_items(
        store,
        scope,
        db,
        &top,
        &item_template,
        &folder.page_prefix,
        folder.depth,
        folder.num_items,
        on_item,
    )?;
    Ok(top)
}

pub(crate) fn require_item(
    store: &dyn ContentStore,
    db: &str,
    path: &str,
) -> Result<Item, ContentError> {
    store
        .get_item(db, path)?
        .ok_or_else(|| ContentError::NotFound(path.to_string()))
}

pub(crate) fn require_template(
    store: &dyn ContentStore,
    db: &str,
    name: &str,
) -> Result<Template, ContentError> {
    store
        .get_template(db, name)?
        .ok_or_else(|| ContentError::TemplateNotFound(name.to_string()))
}
