//! content-ops
//!
//! Bulk content generation, publishing and index maintenance.
//!
//! # Usage
//!
//! ```bash
//! content-ops generate-articles perf 5 --depth 3 [--job]
//! content-ops publish-smart --wait
//! content-ops rebuild-index --index sitecore_master_index --wait
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/content-ops/config.toml)
//! 3. Config file passed with --config
//! 4. Environment variables (CONTENT_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use content_daemon::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
