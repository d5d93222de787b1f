//! Content storage layer for content-ops.
//!
//! Provides:
//! - The [`ContentStore`] trait over per-database item trees
//! - [`ElevatedScope`] guards that gate every mutation
//! - Asynchronous publishing ([`PublishService`]) and search indexes ([`IndexService`])
//! - In-memory implementations of all three, used by the CLI and tests

pub mod index;
pub mod memory;
pub mod models;
pub mod privilege;
pub mod publish;
pub mod store;

pub use index::{InMemorySearchIndex, IndexService};
pub use memory::{path_under, InMemoryContentStore, FOLDER_TEMPLATE, ROOT_PATH};
pub use models::{
    IndexRebuildStatus, Item, ItemEdit, PublishOptions, PublishStatus, SearchHit, Template,
    FIELD_NAVIGATION_TITLE, FIELD_TITLE,
};
pub use privilege::{ElevatedScope, PrivilegeGate};
pub use publish::{InMemoryPublisher, PublishService, DEFAULT_RETAINED_PUBLISHES};
pub use store::ContentStore;
