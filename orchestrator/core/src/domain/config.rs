// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

// Enablement Configuration
//
// Defines the configuration schema for the enablement engine:
// - Storage backend selection and PostgreSQL connection settings
// - Notification delivery (email integration endpoint, worker pool sizing)
// - Logging defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::repository::StorageBackend;

const CONFIG_FILE_NAME: &str = "dsa-enablement.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnablementConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// HTTP endpoint of the email integration. Notifications are only logged when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_workers() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    256
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EnablementConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. DSA_CONFIG_PATH environment variable
    /// 2. ./dsa-enablement.yaml (working directory)
    /// 3. ~/.dsa-enablement/config.yaml (user home)
    /// 4. /etc/dsa-enablement/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("DSA_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from(format!("./{}", CONFIG_FILE_NAME));
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".dsa-enablement").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/dsa-enablement/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                tracing::info!("Environment override: DATABASE_URL");
                self.database.url = url;
            }
        }

        if let Ok(endpoint) = std::env::var("DSA_NOTIFICATION_ENDPOINT") {
            if !endpoint.is_empty() {
                tracing::info!("Environment override: DSA_NOTIFICATION_ENDPOINT={}", endpoint);
                self.notifications.endpoint = Some(endpoint);
            }
        }

        if let Ok(backend) = std::env::var("DSA_STORAGE_BACKEND") {
            match backend.to_lowercase().as_str() {
                "postgres" => self.storage.backend = StorageBackend::Postgres,
                "in_memory" | "memory" => self.storage.backend = StorageBackend::InMemory,
                _ => {
                    tracing::warn!(
                        "Invalid value for DSA_STORAGE_BACKEND: '{}'. Expected postgres/in_memory. Ignoring.",
                        backend
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.trim().is_empty() {
            anyhow::bail!("database.url is required when storage.backend is 'postgres'");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be greater than zero");
        }

        if self.notifications.workers == 0 {
            anyhow::bail!("notifications.workers must be greater than zero");
        }

        if self.notifications.queue_capacity == 0 {
            anyhow::bail!("notifications.queue_capacity must be greater than zero");
        }

        if let Some(endpoint) = &self.notifications.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                anyhow::bail!("notifications.endpoint must be an http(s) URL, got '{}'", endpoint);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = EnablementConfig::from_yaml_str("storage:\n  backend: in_memory\n").unwrap();
        assert_eq!(config.storage.backend, StorageBackend::InMemory);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.notifications.workers, 2);
        assert_eq!(config.notifications.queue_capacity, 256);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_postgres_backend_requires_url() {
        let config = EnablementConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let yaml = r#"
storage:
  backend: in_memory
notifications:
  endpoint: "smtp://mail.local"
"#;
        let config = EnablementConfig::from_yaml_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database:\n  url: postgres://dsa@localhost/dsa\n  max_connections: 9\nnotifications:\n  workers: 4"
        )
        .unwrap();

        let config = EnablementConfig::load_or_default(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.database.max_connections, 9);
        assert_eq!(config.notifications.workers, 4);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = EnablementConfig::load_or_default(Some(PathBuf::from("/nonexistent/dsa.yaml")));
        assert!(result.is_err());
    }
}
