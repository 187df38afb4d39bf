// src/core/config_manager.rs
//! Configuration loading: optional YAML file, then environment overrides

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const DEFAULT_CONFIG_FILE: &str = "jobtrack.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigManager {
    pub api: ApiConfig,
    pub watcher: WatcherConfig,
    pub auth: AuthSourcesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Web app origin used to build job links
    pub app_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            app_url: "http://127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Poll cadence of the queue watcher
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Delay after a snapshot with pending or processing items
    pub active_delay_ms: u64,
    /// Delay after a snapshot with no work in flight
    pub idle_delay_ms: u64,
    /// Delay after a transient failure or a missing token
    pub retry_delay_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            active_delay_ms: 500,
            idle_delay_ms: 2000,
            retry_delay_ms: 5000,
        }
    }
}

impl WatcherConfig {
    pub fn active_delay(&self) -> Duration {
        Duration::from_millis(self.active_delay_ms)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSourcesConfig {
    /// `Cookie:` header style string, e.g. "session=1; auth_token=abc"
    pub cookie: Option<String>,
    pub cookie_name: String,
    /// Persisted extension storage (JSON object)
    pub storage_file: Option<PathBuf>,
    pub storage_key: String,
    /// Local storage exported from the web app's own page
    pub app_storage_file: Option<PathBuf>,
    /// Origin of the tab the host currently looks at
    pub active_origin: Option<String>,
}

impl Default for AuthSourcesConfig {
    fn default() -> Self {
        Self {
            cookie: None,
            cookie_name: "auth_token".to_string(),
            storage_file: None,
            storage_key: "authToken".to_string(),
            app_storage_file: None,
            active_origin: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("/tmp/jobtrack.log"),
        }
    }
}

impl ConfigManager {
    /// Load configuration. An explicit `path` must exist; otherwise
    /// `JOBTRACK_CONFIG` or `./jobtrack.yaml` are used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(path)? {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                info!("No configuration file, using defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn resolve_config_path(path: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Some(path.to_path_buf()));
        }

        if let Ok(from_env) = std::env::var("JOBTRACK_CONFIG") {
            let from_env = PathBuf::from(from_env);
            if !from_env.exists() {
                anyhow::bail!("JOBTRACK_CONFIG points to a missing file: {}", from_env.display());
            }
            return Ok(Some(from_env));
        }

        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        Ok(default.exists().then_some(default))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Invalid configuration YAML")
    }

    /// Apply `JOBTRACK_*` overrides from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("JOBTRACK_API_URL") {
            self.api.base_url = url;
        }
        if let Some(url) = lookup("JOBTRACK_APP_URL") {
            self.api.app_url = url;
        }
        if let Some(cookie) = lookup("JOBTRACK_COOKIE") {
            self.auth.cookie = Some(cookie);
        }
        if let Some(file) = lookup("JOBTRACK_STORAGE_FILE") {
            self.auth.storage_file = Some(PathBuf::from(file));
        }
        if let Some(file) = lookup("JOBTRACK_LOG_FILE") {
            self.logging.file = PathBuf::from(file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_poll_cadence() {
        let config = ConfigManager::default();
        assert_eq!(config.watcher.active_delay(), Duration::from_millis(500));
        assert_eq!(config.watcher.idle_delay(), Duration::from_millis(2000));
        assert_eq!(config.watcher.retry_delay(), Duration::from_millis(5000));
        assert_eq!(config.auth.cookie_name, "auth_token");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "api:\n  base_url: https://api.example.com\nwatcher:\n  idle_delay_ms: 3000\n";
        let config = ConfigManager::from_yaml(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.watcher.idle_delay_ms, 3000);
        assert_eq!(config.watcher.active_delay_ms, 500);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = ConfigManager::from_yaml("  \n").unwrap();
        assert_eq!(config.api.base_url, ApiConfig::default().base_url);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("JOBTRACK_API_URL", "http://queue.local"),
            ("JOBTRACK_COOKIE", "auth_token=abc"),
        ]
        .into_iter()
        .collect();

        let mut config = ConfigManager::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "http://queue.local");
        assert_eq!(config.auth.cookie.as_deref(), Some("auth_token=abc"));
        assert_eq!(config.api.app_url, ApiConfig::default().app_url);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = ConfigManager::load(Some(Path::new("/nonexistent/jobtrack.yaml")));
        assert!(result.is_err());
    }
}
