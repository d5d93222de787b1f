//! Command implementations for content-ops.
//!
//! Every command builds a freshly seeded in-memory backend, runs one
//! handler against it and renders the handler's envelope as JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use content_service::{ArticleSettings, ContentService, FolderSettings};
use content_types::Settings;

use crate::cli::{Cli, Commands};

/// Load configuration, applying CLI overrides (highest precedence).
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the configured level.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Parse-to-output entry point used by the binary.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_tracing(&settings.log_level)?;

    let service =
        ContentService::in_memory(settings).context("Failed to initialise content backend")?;
    let output = execute(&service, cli.command).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to render output")?
    );
    Ok(())
}

/// Run one command against `service` and return its envelope as JSON.
pub async fn execute(service: &ContentService, command: Commands) -> Result<Value> {
    debug!(command = ?command, "Executing command");
    match command {
        Commands::GenerateArticles {
            prefix,
            num_items,
            depth,
            sort_order,
            job,
            interval_ms,
        } => {
            let article = ArticleSettings::new(prefix, num_items)
                .with_depth(depth)
                .with_sort_order(sort_order);
            if job {
                let interval_ms = interval_ms.unwrap_or(service.settings().poller.interval_ms);
                to_json(&service.add_article_as_job_and_wait(&article, interval_ms).await)
            } else {
                to_json(&service.add_article(&article))
            }
        }
        Commands::GenerateFolder {
            parent_path,
            template,
            prefix,
            num_items,
            depth,
            sort_order,
        } => to_json(&service.add_folder_of_items(&FolderSettings {
            parent_path,
            template_name: template,
            page_prefix: prefix,
            num_items,
            depth,
            sort_order,
        })),
        Commands::GetItem { path } => to_json(&service.get_item(&path)),
        Commands::AddItem {
            name,
            parent_path,
            template,
        } => to_json(&service.add_item(&name, &parent_path, template.as_deref())),
        Commands::DelItem { path } => to_json(&service.del_item(&path)),
        Commands::UpdateItem { path } => to_json(&service.update_item(&path)),
        Commands::AddCategory {
            name,
            sort_order,
            parent,
            source,
        } => to_json(&service.add_category(
            &name,
            sort_order,
            parent.as_deref(),
            source.as_deref(),
        )),
        Commands::DelArticle { prefix } => to_json(&service.del_article(&prefix)),
        Commands::PublishSmart {
            wait,
            interval_ms,
            target,
        } => to_json(
            &service
                .publish_smart(wait, interval_ms, target.as_deref())
                .await,
        ),
        Commands::PublishItem {
            path,
            deep,
            wait,
            interval_ms,
            target,
        } => to_json(
            &service
                .publish_item(&path, deep, wait, interval_ms, target.as_deref())
                .await,
        ),
        Commands::RebuildIndex {
            index,
            wait,
            interval_ms,
        } => {
            let index = index.unwrap_or_else(|| service.settings().default_index.clone());
            if wait {
                to_json(&service.index_rebuild_and_wait(&index, interval_ms).await)
            } else {
                to_json(&service.index_rebuild(&index))
            }
        }
        Commands::Search { text, index } => {
            to_json(&service.item_search(&text, index.as_deref()))
        }
        Commands::ListIndexes => to_json(&service.list_indexes()),
        Commands::Version => to_json(&service.version()),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to serialize result")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ContentService {
        ContentService::in_memory(Settings::default()).unwrap()
    }

    #[test]
    fn test_load_settings_log_level_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"warn\"\n").unwrap();

        let settings = load_settings(path.to_str(), None).unwrap();
        assert_eq!(settings.log_level, "warn");

        let settings = load_settings(path.to_str(), Some("trace")).unwrap();
        assert_eq!(settings.log_level, "trace");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_generate_articles_inline() {
        let service = service();
        let output = execute(
            &service,
            Commands::GenerateArticles {
                prefix: "cli".to_string(),
                num_items: 2,
                depth: 2,
                sort_order: 1,
                job: false,
                interval_ms: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(output["success"], Value::Bool(true));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_generate_articles_as_job() {
        let service = service();
        let output = execute(
            &service,
            Commands::GenerateArticles {
                prefix: "clijob".to_string(),
                num_items: 3,
                depth: 2,
                sort_order: 1,
                job: true,
                interval_ms: Some(5),
            },
        )
        .await
        .unwrap();

        assert_eq!(output["outcome"]["success"], Value::Bool(true));
        assert_eq!(output["job"]["state"], Value::String("Finished".to_string()));
        assert_eq!(output["job"]["processed"], Value::from(13u64));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_rebuild_index_default() {
        let service = service();
        let output = execute(
            &service,
            Commands::RebuildIndex {
                index: None,
                wait: true,
                interval_ms: 5,
            },
        )
        .await
        .unwrap();

        assert_eq!(output["success"], Value::Bool(true));
        assert_eq!(output["message"], Value::String("Rebuild Complete".to_string()));
    }

    #[tokio::test]
    async fn test_execute_list_indexes() {
        let output = execute(&service(), Commands::ListIndexes).await.unwrap();
        assert_eq!(
            output,
            serde_json::json!(["sitecore_master_index", "sitecore_web_index"])
        );
    }

    #[tokio::test]
    async fn test_execute_get_item_missing() {
        let output = execute(
            &service(),
            Commands::GetItem {
                path: "/sitecore/content/none".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(output["success"], Value::Bool(false));
    }
}
