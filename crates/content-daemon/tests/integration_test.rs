//! Integration tests for the content-ops command layer.
//!
//! These tests drive a sequence of commands against one shared backend,
//! the way an operator would chain CLI invocations against a live site.

use serde_json::Value;

use content_daemon::{execute, Commands};
use content_service::ContentService;
use content_types::Settings;

/// Test harness that owns one seeded in-memory backend.
struct TestHarness {
    service: ContentService,
    settings: Settings,
}

impl TestHarness {
    fn new() -> Self {
        let settings = Settings::default();
        let service =
            ContentService::in_memory(settings.clone()).expect("Failed to build in-memory backend");
        Self { service, settings }
    }

    async fn run(&self, command: Commands) -> Value {
        execute(&self.service, command)
            .await
            .expect("command produced no output")
    }

    fn top_path(&self, prefix: &str) -> String {
        format!("{}/Top_{prefix}", self.settings.generation.home_path)
    }
}

fn log_messages(envelope: &Value) -> Vec<String> {
    envelope["log"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e["message"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// ==================== Generation Tests ====================

#[tokio::test(flavor = "multi_thread")]
async fn test_generate_then_get_and_delete() {
    let harness = TestHarness::new();

    let generated = harness
        .run(Commands::GenerateArticles {
            prefix: "flow".to_string(),
            num_items: 2,
            depth: 2,
            sort_order: 1,
            job: false,
            interval_ms: None,
        })
        .await;
    assert_eq!(generated["success"], Value::Bool(true));

    let found = harness
        .run(Commands::GetItem {
            path: format!("{}/flow_1/flow_1_2", harness.top_path("flow")),
        })
        .await;
    assert_eq!(found["success"], Value::Bool(true));

    let deleted = harness
        .run(Commands::DelArticle {
            prefix: "flow".to_string(),
        })
        .await;
    assert_eq!(deleted["success"], Value::Bool(true));
    assert!(log_messages(&deleted).contains(&"Deleted: 7".to_string()));

    let missing = harness
        .run(Commands::GetItem {
            path: harness.top_path("flow"),
        })
        .await;
    assert_eq!(missing["success"], Value::Bool(false));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_generate_as_job_reports_progress() {
    let harness = TestHarness::new();

    let submission = harness
        .run(Commands::GenerateArticles {
            prefix: "bg".to_string(),
            num_items: 4,
            depth: 2,
            sort_order: 1,
            job: true,
            interval_ms: Some(5),
        })
        .await;

    assert_eq!(submission["outcome"]["success"], Value::Bool(true));
    assert_eq!(submission["job"]["name"], "PerformanceGeneration");
    assert_eq!(submission["job"]["state"], "Finished");
    assert_eq!(submission["job"]["total"], Value::from(21u64));
    assert_eq!(submission["job"]["percent_complete"], Value::from(100u64));
    assert_eq!(submission["job"]["job_running"], Value::Bool(false));
}

// ==================== Publish Tests ====================

#[tokio::test(flavor = "multi_thread")]
async fn test_generated_tree_is_published() {
    let harness = TestHarness::new();
    harness
        .run(Commands::GenerateArticles {
            prefix: "pub".to_string(),
            num_items: 3,
            depth: 1,
            sort_order: 1,
            job: false,
            interval_ms: None,
        })
        .await;

    let published = harness
        .run(Commands::PublishItem {
            path: harness.top_path("pub"),
            deep: true,
            wait: true,
            interval_ms: 5,
            target: None,
        })
        .await;
    assert_eq!(published["success"], Value::Bool(true));
    assert!(log_messages(&published).contains(&"Processed: 4".to_string()));

    let leaf = format!("{}/pub_3", harness.top_path("pub"));
    assert!(harness
        .service
        .store()
        .get_item("web", &leaf)
        .unwrap()
        .is_some());
}

// ==================== Search Tests ====================

#[tokio::test(flavor = "multi_thread")]
async fn test_rebuild_then_search() {
    let harness = TestHarness::new();
    harness
        .run(Commands::AddCategory {
            name: "Gardening".to_string(),
            sort_order: 2,
            parent: None,
            source: None,
        })
        .await;

    let before = harness
        .run(Commands::Search {
            text: "Garden".to_string(),
            index: None,
        })
        .await;
    assert_eq!(before["results"], Value::Array(Vec::new()));

    let rebuilt = harness
        .run(Commands::RebuildIndex {
            index: None,
            wait: true,
            interval_ms: 5,
        })
        .await;
    assert_eq!(rebuilt["message"], "Rebuild Complete");

    let after = harness
        .run(Commands::Search {
            text: "Garden".to_string(),
            index: None,
        })
        .await;
    assert_eq!(after["message"], "search completed");
    assert_eq!(after["results"][0]["name"], "Gardening");
}

#[tokio::test]
async fn test_version_command() {
    let harness = TestHarness::new();
    let version = harness.run(Commands::Version).await;

    assert_eq!(version["success"], Value::Bool(true));
    let messages = log_messages(&version);
    assert_eq!(messages.first().map(String::as_str), Some("Version: Start"));
    assert!(messages[1].starts_with("FullName: content-ops "));
}
