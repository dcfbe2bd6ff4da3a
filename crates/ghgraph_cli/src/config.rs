//! Configuration file support for ghgraph.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `GHGRAPH_`, sections separated by
//!    `__`, e.g. `GHGRAPH_NEO4J__PASSWORD`)
//! 3. Local config file (./ghgraph.toml)
//! 4. XDG config file (~/.config/ghgraph/config.toml)
//! 5. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or use GHGRAPH_GITHUB__TOKEN
//! timeout_secs = 30
//!
//! [paths]
//! accounts_file = "users_to_fetch.txt"
//! cache_dir = ".cached_results"
//! error_dir = ".errors"
//! progress_log = ".fetched_users.txt"
//!
//! [harvest]
//! poll_interval_secs = 60
//! requests_per_second = 0  # 0 disables pacing
//! retry_transport_errors = true
//!
//! [neo4j]
//! uri = "neo4j://localhost:7687"
//! user = "neo4j"
//! password = ""
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use ghgraph::github::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT, FetchClientConfig};
use ghgraph::retry::RetryConfig;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub paths: PathsConfig,
    pub harvest: HarvestConfig,
    pub neo4j: Neo4jConfig,
}

/// GitHub API access.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub base_url: String,
    /// Personal access token. Unauthenticated requests get a far smaller quota.
    pub token: Option<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
        }
    }
}

/// On-disk locations shared by harvest and import.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub accounts_file: PathBuf,
    pub cache_dir: PathBuf,
    pub error_dir: PathBuf,
    pub progress_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            accounts_file: PathBuf::from("users_to_fetch.txt"),
            cache_dir: PathBuf::from(".cached_results"),
            error_dir: PathBuf::from(".errors"),
            progress_log: PathBuf::from(".fetched_users.txt"),
        }
    }
}

/// Harvest pacing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Longest single sleep while the quota is exhausted.
    pub poll_interval_secs: u64,
    /// Proactive pacing on top of the hourly quota. 0 disables it.
    pub requests_per_second: u32,
    pub retry_transport_errors: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            requests_per_second: 0,
            retry_transport_errors: true,
        }
    }
}

/// Neo4j connection.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "neo4j://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// A broken config source is logged and the defaults are used instead.
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("ghgraph.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./ghgraph.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // GHGRAPH_NEO4J__PASSWORD -> neo4j.password
        builder = builder.add_source(
            Environment::with_prefix("GHGRAPH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Settings for the fetch client.
    pub fn fetch_client_config(&self) -> FetchClientConfig {
        let retry = if self.harvest.retry_transport_errors {
            RetryConfig::default()
        } else {
            RetryConfig::disabled()
        };
        FetchClientConfig {
            base_url: self.github.base_url.clone(),
            token: self.github.token.clone().filter(|t| !t.trim().is_empty()),
            user_agent: self.github.user_agent.clone(),
            timeout: Duration::from_secs(self.github.timeout_secs),
            poll_interval: Duration::from_secs(self.harvest.poll_interval_secs.max(1)),
            retry,
        }
    }

    /// The default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ghgraph").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.base_url, "https://api.github.com");
        assert!(config.github.token.is_none());
        assert_eq!(config.github.timeout_secs, 30);
        assert_eq!(config.paths.accounts_file, PathBuf::from("users_to_fetch.txt"));
        assert_eq!(config.paths.cache_dir, PathBuf::from(".cached_results"));
        assert_eq!(config.paths.error_dir, PathBuf::from(".errors"));
        assert_eq!(config.harvest.poll_interval_secs, 60);
        assert_eq!(config.harvest.requests_per_second, 0);
        assert!(config.harvest.retry_transport_errors);
        assert_eq!(config.neo4j.uri, "neo4j://localhost:7687");
        assert_eq!(config.neo4j.user, "neo4j");
    }

    #[test]
    fn test_config_builder_with_defaults() {
        let config: Config = ConfigBuilder::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.paths.progress_log, PathBuf::from(".fetched_users.txt"));
        assert_eq!(config.github.user_agent, "ghgraph");
    }

    #[test]
    fn test_config_builder_partial_override() {
        let config = from_toml(
            r#"
            [harvest]
            poll_interval_secs = 5
        "#,
        );
        assert_eq!(config.harvest.poll_interval_secs, 5);
        // Other values should be defaults
        assert!(config.harvest.retry_transport_errors);
        assert_eq!(config.paths.cache_dir, PathBuf::from(".cached_results"));
    }

    #[test]
    fn test_full_config_parsing() {
        let config = from_toml(
            r#"
            [github]
            base_url = "https://ghe.example.com/api/v3"
            token = "ghp_test123"
            timeout_secs = 10

            [paths]
            accounts_file = "accounts.txt"
            cache_dir = "/tmp/cache"

            [harvest]
            requests_per_second = 2
            retry_transport_errors = false

            [neo4j]
            uri = "neo4j://graph:7687"
            password = "secret"
        "#,
        );

        assert_eq!(config.github.base_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.github.token.as_deref(), Some("ghp_test123"));
        assert_eq!(config.paths.accounts_file, PathBuf::from("accounts.txt"));
        assert_eq!(config.paths.cache_dir, PathBuf::from("/tmp/cache"));
        assert_eq!(config.harvest.requests_per_second, 2);
        assert!(!config.harvest.retry_transport_errors);
        assert_eq!(config.neo4j.uri, "neo4j://graph:7687");
        assert_eq!(config.neo4j.user, "neo4j");
        assert_eq!(config.neo4j.password, "secret");
    }

    #[test]
    fn test_fetch_client_config_maps_settings() {
        let config = from_toml(
            r#"
            [github]
            token = "  "
            timeout_secs = 12

            [harvest]
            poll_interval_secs = 0
            retry_transport_errors = false
        "#,
        );

        let fetch = config.fetch_client_config();
        assert!(fetch.token.is_none());
        assert_eq!(fetch.timeout, Duration::from_secs(12));
        assert_eq!(fetch.poll_interval, Duration::from_secs(1));
        assert_eq!(fetch.retry.max_retries, 0);
    }

    #[test]
    fn test_default_config_path_is_named_after_the_tool() {
        if let Some(path) = Config::default_config_path() {
            assert!(path.ends_with("config.toml"));
            assert!(path.to_string_lossy().contains("ghgraph"));
        }
    }
}
