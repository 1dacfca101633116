//! Application configuration management.
//!
//! Configuration is stored at `~/.config/versecache/config.json`. Every
//! field is optional; missing values fall back to the built-in defaults and
//! `VERSECACHE_CONTENT_URL` / `VERSECACHE_USER` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::client::DEFAULT_TIMEOUT_SECS;
use crate::content::DEFAULT_CONTENT_BASE_URL;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "versecache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_USER_ID: &str = "local";

pub const CONTENT_URL_ENV: &str = "VERSECACHE_CONTENT_URL";
pub const USER_ENV: &str = "VERSECACHE_USER";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub content_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub data_dir: Option<PathBuf>,
    pub user_id: Option<String>,
}

impl Config {
    /// Load from the default location. An unreadable file is logged and
    /// replaced by defaults; environment overrides are applied either way.
    pub fn load() -> Self {
        let config = match Self::config_path() {
            Ok(path) => Self::load_from(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %format!("{:#}", e), "Using default config");
                Self::default()
            }),
            Err(e) => {
                warn!(error = %e, "No config directory, using default config");
                Self::default()
            }
        };
        config.with_env_overrides(|name| std::env::var(name).ok())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply environment overrides through `lookup`, so tests need not
    /// touch the process environment.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(CONTENT_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.content_base_url = Some(url);
        }
        if let Some(user) = lookup(USER_ENV).filter(|v| !v.trim().is_empty()) {
            self.user_id = Some(user);
        }
        self
    }

    pub fn content_base_url(&self) -> &str {
        self.content_base_url
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_BASE_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or(DEFAULT_USER_ID)
    }

    /// Directory holding cache entries and progress records.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.content_base_url(), DEFAULT_CONTENT_BASE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.user_id(), "local");
    }

    #[test]
    fn test_save_and_load_from() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config {
            content_base_url: Some("http://localhost:9000".into()),
            request_timeout_secs: Some(3),
            data_dir: Some(dir.path().join("data")),
            user_id: Some("ruth".into()),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.data_dir().unwrap(), dir.path().join("data"));
        assert_eq!(loaded.request_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "user_id": "naomi" }"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.user_id(), "naomi");
        assert_eq!(loaded.content_base_url(), DEFAULT_CONTENT_BASE_URL);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config {
            user_id: Some("file-user".into()),
            ..Default::default()
        }
        .with_env_overrides(|name| match name {
            CONTENT_URL_ENV => Some("http://mirror.test".to_string()),
            USER_ENV => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.content_base_url(), "http://mirror.test");
        assert_eq!(config.user_id(), "file-user");
    }
}
