//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DSYNC_*)
//! 2. TOML config file (if DSYNC_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Default time-to-live for stored entries (one hour).
pub const DEFAULT_TTL_MS: u64 = 3_600_000;

/// Default store identifier.
pub const DEFAULT_STORE_NAME: &str = "dsync-cache";

/// Default collection identifier.
pub const DEFAULT_COLLECTION: &str = "datasets";

/// Immutable per-service cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live applied to every write.
    pub ttl: Duration,
    /// Name of the backing store (database file stem).
    pub store_name: String,
    /// Collection within the store that holds this service's entries.
    pub collection: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(DEFAULT_TTL_MS),
            store_name: DEFAULT_STORE_NAME.into(),
            collection: DEFAULT_COLLECTION.into(),
        }
    }
}

impl CacheConfig {
    /// TTL in milliseconds, clamped to at least 1 so `expires_at > stored_at` holds.
    pub fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX).max(1)
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (DSYNC_*)
/// 2. TOML config file (if DSYNC_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the SQLite store.
    ///
    /// Set via DSYNC_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Store identifier; the database file is `<cache_dir>/<store_name>.sqlite`.
    ///
    /// Set via DSYNC_STORE_NAME environment variable.
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Collection identifier scoping entries inside the store.
    ///
    /// Set via DSYNC_COLLECTION environment variable.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Entry time-to-live in milliseconds.
    ///
    /// Set via DSYNC_TTL_MS environment variable.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Dataset URL used when a load request does not name one.
    ///
    /// Set via DSYNC_DATASET_URL environment variable.
    #[serde(default)]
    pub dataset_url: Option<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via DSYNC_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via DSYNC_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via DSYNC_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Directory the spool ingestor writes delivered payloads into.
    ///
    /// Set via DSYNC_SPOOL_DIR environment variable.
    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./.dsync")
}

fn default_store_name() -> String {
    DEFAULT_STORE_NAME.into()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.into()
}

fn default_ttl_ms() -> u64 {
    DEFAULT_TTL_MS
}

fn default_user_agent() -> String {
    "dsync/0.1".into()
}

fn default_max_bytes() -> u64 {
    256 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_spool_dir() -> PathBuf {
    PathBuf::from("./.dsync/spool")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            store_name: default_store_name(),
            collection: default_collection(),
            ttl_ms: default_ttl_ms(),
            dataset_url: None,
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            spool_dir: default_spool_dir(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Path of the SQLite database backing the entry store.
    pub fn db_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.sqlite", self.store_name))
    }

    /// Project the immutable cache settings.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_millis(self.ttl_ms),
            store_name: self.store_name.clone(),
            collection: self.collection.clone(),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `DSYNC_`
    /// 2. TOML file from `DSYNC_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DSYNC_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DSYNC_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Resolve the URL for a load request, falling back to `dataset_url`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if neither is set.
    pub fn resolve_dataset_url<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str, ConfigError> {
        requested
            .filter(|u| !u.trim().is_empty())
            .or(self.dataset_url.as_deref())
            .ok_or_else(|| ConfigError::Missing {
                field: "dataset_url".into(),
                hint: "Pass a url or set DSYNC_DATASET_URL environment variable".into(),
            })
    }
}
