//! CLI argument parsing for content-ops.
//!
//! CLI flags override all other config sources.

use clap::{Parser, Subcommand};

/// Content operations
///
/// Generates, publishes and indexes content against a seeded in-memory
/// content store and prints each result envelope as JSON.
#[derive(Parser, Debug)]
#[command(name = "content-ops")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/content-ops/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate a Top_<prefix> article tree under the site home
    GenerateArticles {
        /// Page name prefix
        prefix: String,

        /// Children per node
        num_items: u32,

        /// Tree depth below the top item
        #[arg(short, long, default_value = "1")]
        depth: u32,

        /// Sort order of the top item
        #[arg(long, default_value = "1")]
        sort_order: i32,

        /// Run as a background job and poll until it finishes
        #[arg(long)]
        job: bool,

        /// Poll interval for --job in milliseconds (default from config)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Generate a <prefix>Folder tree under any parent
    GenerateFolder {
        /// Parent item path
        parent_path: String,

        /// Template for the generated items
        template: String,

        /// Page name prefix
        prefix: String,

        /// Children per node
        num_items: u32,

        #[arg(short, long, default_value = "1")]
        depth: u32,

        #[arg(long, default_value = "1")]
        sort_order: i32,
    },

    /// Check that an item exists
    GetItem { path: String },

    /// Add an item
    AddItem {
        name: String,

        parent_path: String,

        /// Template name (default: the configured article template)
        #[arg(short, long)]
        template: Option<String>,
    },

    /// Delete an item and its descendants
    DelItem { path: String },

    /// Stamp an item's title with the current time
    UpdateItem { path: String },

    /// Copy the articles item as a new category
    AddCategory {
        name: String,

        #[arg(long, default_value = "1")]
        sort_order: i32,

        /// Parent path (default: site home)
        #[arg(long)]
        parent: Option<String>,

        /// Item to copy (default: site articles item)
        #[arg(long)]
        source: Option<String>,
    },

    /// Delete a Top_<prefix> article tree
    DelArticle { prefix: String },

    /// Publish everything that changed
    PublishSmart {
        /// Wait for the publish to finish
        #[arg(short, long)]
        wait: bool,

        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        /// Target database (default from config)
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Publish one item
    PublishItem {
        path: String,

        /// Include descendants
        #[arg(long)]
        deep: bool,

        #[arg(short, long)]
        wait: bool,

        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        #[arg(short, long)]
        target: Option<String>,
    },

    /// Rebuild a search index
    RebuildIndex {
        /// Index name (default from config)
        #[arg(short, long)]
        index: Option<String>,

        /// Wait for the rebuild to finish
        #[arg(short, long)]
        wait: bool,

        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },

    /// Search an index by item name
    Search {
        text: String,

        #[arg(short, long)]
        index: Option<String>,
    },

    /// List search indexes
    ListIndexes,

    /// Show the product version
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_generate_articles_defaults() {
        let cli = Cli::parse_from(["content-ops", "generate-articles", "perf", "5"]);
        match cli.command {
            Commands::GenerateArticles {
                prefix,
                num_items,
                depth,
                sort_order,
                job,
                interval_ms,
            } => {
                assert_eq!(prefix, "perf");
                assert_eq!(num_items, 5);
                assert_eq!(depth, 1);
                assert_eq!(sort_order, 1);
                assert!(!job);
                assert_eq!(interval_ms, None);
            }
            _ => panic!("Expected GenerateArticles command"),
        }
    }

    #[test]
    fn test_cli_generate_articles_job() {
        let cli = Cli::parse_from([
            "content-ops",
            "generate-articles",
            "perf",
            "3",
            "-d",
            "3",
            "--job",
            "--interval-ms",
            "50",
        ]);
        match cli.command {
            Commands::GenerateArticles {
                depth,
                job,
                interval_ms,
                ..
            } => {
                assert_eq!(depth, 3);
                assert!(job);
                assert_eq!(interval_ms, Some(50));
            }
            _ => panic!("Expected GenerateArticles command"),
        }
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::parse_from(["content-ops", "--config", "/path/to/config.toml", "version"]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_cli_global_log_level_after_subcommand() {
        let cli = Cli::parse_from(["content-ops", "list-indexes", "--log-level", "debug"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_publish_item() {
        let cli = Cli::parse_from([
            "content-ops",
            "publish-item",
            "/sitecore/content/home",
            "--deep",
            "--wait",
            "-t",
            "web",
        ]);
        match cli.command {
            Commands::PublishItem {
                path,
                deep,
                wait,
                interval_ms,
                target,
            } => {
                assert_eq!(path, "/sitecore/content/home");
                assert!(deep);
                assert!(wait);
                assert_eq!(interval_ms, 1000);
                assert_eq!(target, Some("web".to_string()));
            }
            _ => panic!("Expected PublishItem command"),
        }
    }

    #[test]
    fn test_cli_add_category() {
        let cli = Cli::parse_from(["content-ops", "add-category", "Travel", "--sort-order", "4"]);
        match cli.command {
            Commands::AddCategory {
                name,
                sort_order,
                parent,
                source,
            } => {
                assert_eq!(name, "Travel");
                assert_eq!(sort_order, 4);
                assert!(parent.is_none());
                assert!(source.is_none());
            }
            _ => panic!("Expected AddCategory command"),
        }
    }

    #[test]
    fn test_cli_rebuild_index() {
        let cli = Cli::parse_from(["content-ops", "rebuild-index", "-i", "sitecore_web_index", "-w"]);
        match cli.command {
            Commands::RebuildIndex { index, wait, .. } => {
                assert_eq!(index, Some("sitecore_web_index".to_string()));
                assert!(wait);
            }
            _ => panic!("Expected RebuildIndex command"),
        }
    }
}
