//! In-memory content store.
//!
//! Each database is a path-ordered map of items plus the set of templates
//! it knows. All databases share one `RwLock`; no lock is held across calls.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use content_types::{ContentError, Settings};
use tracing::debug;

use crate::models::{
    child_path, is_descendant, parent_path, Item, ItemEdit, Template, FIELD_NAVIGATION_TITLE,
    FIELD_TITLE,
};
use crate::privilege::{ElevatedScope, PrivilegeGate};
use crate::store::ContentStore;

/// Root item every database starts with.
pub const ROOT_PATH: &str = "/sitecore";

/// Template given to ancestors created while seeding a path.
pub const FOLDER_TEMPLATE: &str = "Common/Folder";

#[derive(Debug, Default)]
struct Database {
    items: BTreeMap<String, Item>,
    templates: BTreeSet<String>,
}

impl Database {
    fn with_root() -> Self {
        let mut db = Self::default();
        let root = Item::new("", ROOT_PATH.trim_start_matches('/'), FOLDER_TEMPLATE);
        db.items.insert(root.path.clone(), root);
        db.templates.insert(FOLDER_TEMPLATE.to_string());
        db
    }

    fn item(&self, path: &str) -> Result<&Item, ContentError> {
        self.items
            .get(normalize(path))
            .ok_or_else(|| ContentError::NotFound(path.to_string()))
    }

    fn ensure_free(&self, path: &str) -> Result<(), ContentError> {
        if self.items.contains_key(path) {
            return Err(ContentError::InvalidInput(format!(
                "Item already exists at {path}"
            )));
        }
        Ok(())
    }

    /// Create `path` and any missing ancestors; returns the item at `path`.
    fn ensure_path(&mut self, path: &str, template: &str) -> Item {
        let path = normalize(path);
        if let Some(existing) = self.items.get(path) {
            return existing.clone();
        }
        let item = match parent_path(path) {
            Some(parent) => {
                self.ensure_path(parent, FOLDER_TEMPLATE);
                let name = path.rsplit('/').next().unwrap_or(path);
                Item::new(parent, name, template)
            }
            None => Item::new("", path.trim_start_matches('/'), template),
        };
        self.items.insert(item.path.clone(), item.clone());
        item
    }
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Content store backed by in-process maps.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    databases: RwLock<HashMap<String, Database>>,
    gate: PrivilegeGate,
}

impl InMemoryContentStore {
    /// Create a store with the given (empty) databases.
    pub fn new<I, S>(databases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let databases = databases
            .into_iter()
            .map(|name| (name.into(), Database::with_root()))
            .collect();
        Self {
            databases: RwLock::new(databases),
            gate: PrivilegeGate::new(),
        }
    }

    /// Create the source and target databases and seed the site the
    /// generators work against: home and articles items in the source
    /// database, and the article and folder templates everywhere.
    pub fn with_site(settings: &Settings) -> Self {
        let generation = &settings.generation;
        let store = Self::new([
            settings.source_database.clone(),
            settings.target_database.clone(),
        ]);
        {
            let mut databases = store.write();
            for db in databases.values_mut() {
                db.templates.insert(generation.article_template.clone());
                db.templates.insert(generation.folder_template.clone());
            }
            if let Some(source) = databases.get_mut(&settings.source_database) {
                source.ensure_path(&generation.home_path, FOLDER_TEMPLATE);
                let mut articles =
                    source.ensure_path(&generation.articles_path, &generation.article_template);
                articles
                    .fields
                    .insert(FIELD_TITLE.to_string(), articles.name.clone());
                articles
                    .fields
                    .insert(FIELD_NAVIGATION_TITLE.to_string(), articles.name.clone());
                source.items.insert(articles.path.clone(), articles);
            }
        }
        store
    }

    /// Register a template in `db`.
    pub fn add_template(&self, db: &str, name: &str) -> Result<(), ContentError> {
        let mut databases = self.write();
        let database = database_mut(&mut databases, db)?;
        database.templates.insert(name.to_string());
        Ok(())
    }

    /// Create `path` (and missing ancestors) in `db` without a privilege check.
    pub fn seed_path(&self, db: &str, path: &str, template: &str) -> Result<Item, ContentError> {
        let mut databases = self.write();
        let database = database_mut(&mut databases, db)?;
        Ok(database.ensure_path(path, template))
    }

    /// Every item in `db` in path order.
    pub fn items(&self, db: &str) -> Result<Vec<Item>, ContentError> {
        let databases = self.read();
        Ok(database(&databases, db)?.items.values().cloned().collect())
    }

    /// The item at `path` plus, when `deep`, everything below it.
    pub fn subtree(&self, db: &str, path: &str, deep: bool) -> Result<Vec<Item>, ContentError> {
        let databases = self.read();
        let database = database(&databases, db)?;
        let root = database.item(path)?;
        let mut items = vec![root.clone()];
        if deep {
            items.extend(
                database
                    .items
                    .range::<str, _>((
                        std::ops::Bound::Excluded(root.path.as_str()),
                        std::ops::Bound::Unbounded,
                    ))
                    .filter(|(p, _)| is_descendant(&root.path, p))
                    .map(|(_, item)| item.clone()),
            );
        }
        Ok(items)
    }

    /// Insert or replace an item verbatim; returns whether anything changed.
    pub fn upsert_item(
        &self,
        scope: &ElevatedScope,
        db: &str,
        item: &Item,
    ) -> Result<bool, ContentError> {
        self.gate.check(scope, "upsert_item")?;
        let mut databases = self.write();
        let database = database_mut(&mut databases, db)?;
        if database.items.get(&item.path) == Some(item) {
            return Ok(false);
        }
        database.items.insert(item.path.clone(), item.clone());
        Ok(true)
    }

    /// Scopes issued by this store that are still alive.
    pub fn open_scopes(&self) -> usize {
        self.gate.open_scopes()
    }

    pub fn has_database(&self, db: &str) -> bool {
        self.read().contains_key(db)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Database>> {
        self.databases.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Database>> {
        self.databases.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn database<'a>(
    databases: &'a HashMap<String, Database>,
    db: &str,
) -> Result<&'a Database, ContentError> {
    databases
        .get(db)
        .ok_or_else(|| ContentError::InvalidInput(format!("Unknown database {db}")))
}

fn database_mut<'a>(
    databases: &'a mut HashMap<String, Database>,
    db: &str,
) -> Result<&'a mut Database, ContentError> {
    databases
        .get_mut(db)
        .ok_or_else(|| ContentError::InvalidInput(format!("Unknown database {db}")))
}

impl ContentStore for InMemoryContentStore {
    fn get_item(&self, db: &str, path: &str) -> Result<Option<Item>, ContentError> {
        let databases = self.read();
        Ok(database(&databases, db)?
            .items
            .get(normalize(path))
            .cloned())
    }

    fn get_template(&self, db: &str, name: &str) -> Result<Option<Template>, ContentError> {
        let databases = self.read();
        Ok(database(&databases, db)?
            .templates
            .get(name)
            .map(|name| Template::new(name.clone())))
    }

    fn add_item(
        &self,
        scope: &ElevatedScope,
        db: &str,
        parent_path: &str,
        name: &str,
        template: &Template,
    ) -> Result<Item, ContentError> {
        self.gate.check(scope, "add_item")?;
        let mut databases = self.write();
        let database = database_mut(&mut databases, db)?;

        let parent = database.item(parent_path)?;
        if !database.templates.contains(&template.name) {
            return Err(ContentError::TemplateNotFound(template.name.clone()));
        }
        let item = Item::new(&parent.path, name, &template.name);
        database.ensure_free(&item.path)?;

        debug!(db, path = %item.path, template = %template.name, "Item added");
        database.items.insert(item.path.clone(), item.clone());
        Ok(item)
    }

    fn copy_item(
        &self,
        scope: &ElevatedScope,
        db: &str,
        source_path: &str,
        dest_parent_path: &str,
        new_name: &str,
    ) -> Result<Item, ContentError> {
        self.gate.check(scope, "copy_item")?;
        let mut databases = self.write();
        let database = database_mut(&mut databases, db)?;

        let source = database.item(source_path)?;
        let parent = database.item(dest_parent_path)?;
        let fresh = Item::new(&parent.path, new_name, &source.template);
        let copy = Item {
            fields: source.fields.clone(),
            sort_order: source.sort_order,
            ..fresh
        };
        database.ensure_free(&copy.path)?;

        debug!(db, from = %source_path, to = %copy.path, "Item copied");
        database.items.insert(copy.path.clone(), copy.clone());
        Ok(copy)
    }

    fn edit_item(
        &self,
        scope: &ElevatedScope,
        db: &str,
        path: &str,
        edit: &ItemEdit,
    ) -> Result<Item, ContentError> {
        self.gate.check(scope, "edit_item")?;
        let mut databases = self.write();
        let database = database_mut(&mut databases, db)?;

        let item = database
            .items
            .get_mut(normalize(path))
            .ok_or_else(|| ContentError::NotFound(path.to_string()))?;
        edit.apply(item);
        Ok(item.clone())
    }

    fn delete_item(
        &self,
        scope: &ElevatedScope,
        db: &str,
        path: &str,
    ) -> Result<usize, ContentError> {
        self.gate.check(scope, "delete_item")?;
        let mut databases = self.write();
        let database = database_mut(&mut databases, db)?;

        let root = database.item(path)?.path.clone();
        let before = database.items.len();
        database
            .items
            .retain(|p, _| p != &root && !is_descendant(&root, p));
        let removed = before - database.items.len();

        debug!(db, path = %root, removed, "Item deleted");
        Ok(removed)
    }

    fn children(&self, db: &str, path: &str) -> Result<Vec<Item>, ContentError> {
        let databases = self.read();
        let database = database(&databases, db)?;
        let parent = database.item(path)?;

        let mut children: Vec<Item> = database
            .items
            .values()
            .filter(|item| item.parent_path() == Some(parent.path.as_str()))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        Ok(children)
    }

    fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn elevate(&self) -> ElevatedScope {
        self.gate.elevate()
    }
}

/// Path of the item `name` would get under `parent`.
pub fn path_under(parent: &str, name: &str) -> String {
    child_path(normalize(parent), name)
}
