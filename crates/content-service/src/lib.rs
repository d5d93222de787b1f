//! Operation handlers for content-ops.
//!
//! Provides:
//! - Bulk article and folder tree generation, inline or as a background job
//! - Single-item get, add, delete, update and category handlers
//! - Publish handlers with optional wait-for-completion
//! - Search index rebuild, rebuild status and item search
//!
//! Every handler returns an envelope ([`RequestOutcome`](content_types::RequestOutcome),
//! [`IndexRebuild`] or [`SearchResults`]) and never an error.

pub mod deployment;
pub mod generation;
pub mod items;
pub mod publish;
pub mod search;
pub mod service;
pub mod tree;

pub use deployment::PRODUCT_NAME;
pub use generation::JobSubmission;
pub use publish::PUBLISH_LANGUAGE;
pub use search::{IndexRebuild, SearchResults};
pub use service::ContentService;
pub use tree::{create_article_tree, create_folder_tree, tree_size, ArticleSettings, FolderSettings};
