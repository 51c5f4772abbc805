//! Configuration schema for artcache
//!
//! Configuration is stored at `~/.config/artcache/config.toml`

use crate::hasher::DEFAULT_MEMO_CAPACITY;
use crate::index::DEFAULT_MAX_HISTORY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache location and defaults
    pub cache: CacheConfig,

    /// Built-in repo file adapter settings
    pub github: GithubConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Base directory holding `index` and `cache/` (default: user cache dir)
    pub dir: Option<PathBuf>,

    /// Lifetime in seconds applied to newly registered tokens
    pub default_lifetime_secs: Option<u64>,

    /// Number of token hashes memoized in memory
    pub hash_memo_capacity: usize,

    /// History snapshots kept per token; older ones are dropped
    pub max_history: usize,
}

impl CacheConfig {
    /// Effective base directory
    pub fn base_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(super::ConfigManager::default_cache_dir)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            default_lifetime_secs: None,
            hash_memo_capacity: DEFAULT_MEMO_CAPACITY,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

/// Raw content host settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Base URL serving `<org>/<repo>/<branch>/<path>`
    pub raw_base_url: String,

    /// Branch used when a token names none
    pub default_branch: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            raw_base_url: "https://raw.githubusercontent.com".to_string(),
            default_branch: "main".to_string(),
        }
    }
}
