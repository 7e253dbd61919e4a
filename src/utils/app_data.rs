use crate::index::cache::CacheConfig;
use crate::index::types::{SearchConfig, DEFAULT_EXTENSION};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "vault-search";
const CONFIG_FILE: &str = "config.json";

/// Application configuration stored in the platform config directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Maximum number of vault indexes kept in memory
    #[serde(default = "default_max_vaults")]
    pub max_vaults: usize,

    /// How long a cached index may live before it is rebuilt
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Extension of the documents to index
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Files read in parallel per batch while building
    #[serde(default = "default_build_batch_size")]
    pub build_batch_size: usize,

    /// Soft deadline for verifying content search hits
    #[serde(default = "default_content_search_budget_ms")]
    pub content_search_budget_ms: u64,
}

fn default_max_vaults() -> usize {
    10
}

fn default_ttl_ms() -> u64 {
    5 * 60 * 1000
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_build_batch_size() -> usize {
    50
}

fn default_content_search_budget_ms() -> u64 {
    500
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_vaults: default_max_vaults(),
            ttl_ms: default_ttl_ms(),
            extension: default_extension(),
            build_batch_size: default_build_batch_size(),
            content_search_budget_ms: default_content_search_budget_ms(),
        }
    }
}

impl AppConfig {
    /// Load config from the app config directory, or return default if not found
    pub fn load() -> Result<Self> {
        match get_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn search_config(&self) -> SearchConfig {
        let extension = self.extension.trim_start_matches('.');
        SearchConfig {
            extension: if extension.is_empty() {
                default_extension()
            } else {
                extension.to_string()
            },
            build_batch_size: self.build_batch_size.max(1),
            content_search_budget: Duration::from_millis(self.content_search_budget_ms),
            ..SearchConfig::default()
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_vaults: self.max_vaults,
            ttl: Duration::from_millis(self.ttl_ms),
        }
    }
}

/// Path of the config file, if the platform has a config directory
pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_NAME).join(CONFIG_FILE))
}
