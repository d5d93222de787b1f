//! Configuration loading for content-ops.
//!
//! Layered config: defaults -> config file -> CLI config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/content-ops/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ContentError;

/// Where generated content trees are rooted and which templates they use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Site home item; generated `Top_<prefix>` items are created beneath it
    #[serde(default = "default_home_path")]
    pub home_path: String,

    /// Item copied to form the top of each generated article tree
    #[serde(default = "default_articles_path")]
    pub articles_path: String,

    /// Template used for every generated article page
    #[serde(default = "default_article_template")]
    pub article_template: String,

    /// Template used for the container of a generated folder tree
    #[serde(default = "default_folder_template")]
    pub folder_template: String,

    /// Job slot used for background article generation
    #[serde(default = "default_job_name")]
    pub job_name: String,
}

fn default_home_path() -> String {
    "/sitecore/content/Demo SXA Sites/LighthouseLifestyle/home".to_string()
}

fn default_articles_path() -> String {
    format!("{}/articles", default_home_path())
}

fn default_article_template() -> String {
    "Project/Demo Shared SXA Sites/SitecoreDemo/Pages/Article Page".to_string()
}

fn default_folder_template() -> String {
    "Common/Folder".to_string()
}

fn default_job_name() -> String {
    "PerformanceGeneration".to_string()
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            home_path: default_home_path(),
            articles_path: default_articles_path(),
            article_template: default_article_template(),
            folder_template: default_folder_template(),
            job_name: default_job_name(),
        }
    }
}

/// Defaults for the blocking "wait" variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Interval between status checks in milliseconds
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,

    /// Give up after this many milliseconds; unbounded when absent
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_poll_interval() -> u64 {
    1000
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            timeout_ms: None,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Database that content is authored in
    #[serde(default = "default_source_database")]
    pub source_database: String,

    /// Default publish target
    #[serde(default = "default_target_database")]
    pub target_database: String,

    /// Search index used when a request names none
    #[serde(default = "default_index")]
    pub default_index: String,

    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub poller: PollerSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_source_database() -> String {
    "master".to_string()
}

fn default_target_database() -> String {
    "web".to_string()
}

fn default_index() -> String {
    "sitecore_master_index".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            source_database: default_source_database(),
            target_database: default_target_database(),
            default_index: default_index(),
            generation: GenerationSettings::default(),
            poller: PollerSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/content-ops/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (CONTENT_*, nested keys joined with `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ContentError> {
        let config_dir = ProjectDirs::from("", "", "content-ops")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| ContentError::Config(e.to_string()))?
            .set_default("source_database", default_source_database())
            .map_err(|e| ContentError::Config(e.to_string()))?
            .set_default("target_database", default_target_database())
            .map_err(|e| ContentError::Config(e.to_string()))?
            .set_default("default_index", default_index())
            .map_err(|e| ContentError::Config(e.to_string()))?
            .set_default("poller.interval_ms", default_poll_interval())
            .map_err(|e| ContentError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // CONTENT_LOG_LEVEL, CONTENT_POLLER__INTERVAL_MS, CONTENT_GENERATION__JOB_NAME, ...
        builder = builder.add_source(
            Environment::with_prefix("CONTENT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| ContentError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| ContentError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ContentError> {
        let required = [
            ("source_database", &self.source_database),
            ("target_database", &self.target_database),
            ("generation.home_path", &self.generation.home_path),
            ("generation.articles_path", &self.generation.articles_path),
            ("generation.article_template", &self.generation.article_template),
            ("generation.job_name", &self.generation.job_name),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ContentError::Config(format!("{key} must not be empty")));
            }
        }
        if self.poller.interval_ms == 0 {
            return Err(ContentError::Config(
                "poller.interval_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
