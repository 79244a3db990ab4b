//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Upper bound on a single dataset download: SQLite's default `SQLITE_MAX_LENGTH`,
/// the largest blob the entry store can hold.
const MAX_BYTES_LIMIT: u64 = 1_000_000_000;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `store_name` or `collection` is not a plain identifier
    /// - `ttl_ms` is 0
    /// - `max_bytes` is 0 or exceeds the store's blob limit (1e9 bytes)
    /// - `timeout_ms` is less than 100ms or exceeds 10 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.store_name) {
            return Err(ConfigError::Invalid {
                field: "store_name".into(),
                reason: "must be non-empty and contain only [A-Za-z0-9_-]".into(),
            });
        }
        if !is_identifier(&self.collection) {
            return Err(ConfigError::Invalid {
                field: "collection".into(),
                reason: "must be non-empty and contain only [A-Za-z0-9_-]".into(),
            });
        }

        if self.ttl_ms == 0 {
            return Err(ConfigError::Invalid { field: "ttl_ms".into(), reason: "must be greater than 0".into() });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > MAX_BYTES_LIMIT {
            return Err(ConfigError::Invalid {
                field: "max_bytes".into(),
                reason: format!("must not exceed {MAX_BYTES_LIMIT} bytes (largest storable payload)"),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 600_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 10 minutes (600000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.dataset_url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            tracing::warn!("dataset_url is set but blank; load requests must name a url");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_store_name_empty() {
        let config = AppConfig { store_name: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "store_name"));
    }

    #[test]
    fn test_validate_collection_with_path_separator() {
        let config = AppConfig { collection: "a/b".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "collection"));
    }

    #[test]
    fn test_validate_ttl_zero() {
        let config = AppConfig { ttl_ms: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "ttl_ms"));
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_max_bytes_exceeds_limit() {
        let config = AppConfig { max_bytes: MAX_BYTES_LIMIT + 1, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_max_bytes_stays_within_sqlite_blob_limit() {
        let at_limit = AppConfig { max_bytes: 1_000_000_000, ..Default::default() };
        assert!(at_limit.validate().is_ok());

        for max_bytes in [1_000_000_001, 2 * 1024 * 1024 * 1024] {
            let config = AppConfig { max_bytes, ..Default::default() };
            assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
        }
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 600_001, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { ttl_ms: 1, max_bytes: 1, timeout_ms: 100, ..Default::default() }; // minimum valid values
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_values() {
        let config = AppConfig { max_bytes: MAX_BYTES_LIMIT, timeout_ms: 600_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
