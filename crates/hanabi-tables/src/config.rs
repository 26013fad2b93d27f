//! Table server configuration.
//!
//! This module defines the settings the binary reads at startup.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Result, TableError};
use crate::sanitize::TagSanitizer;

/// Configuration for the table service.
#[derive(Debug, Clone, Deserialize)]
pub struct TablesConfig {
    /// Maximum tag length in characters, after normalization.
    #[serde(default = "TablesConfig::default_max_tag_length")]
    pub max_tag_length: usize,

    /// `RocksDB` directory for archived tags. Tags are kept in memory when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Tracing filter used when `RUST_LOG` is not set.
    #[serde(default = "TablesConfig::default_log_filter")]
    pub log_filter: String,
}

impl TablesConfig {
    const fn default_max_tag_length() -> usize {
        TagSanitizer::DEFAULT_MAX_LENGTH
    }

    fn default_log_filter() -> String {
        "info,hanabi=debug".to_string()
    }

    /// Load configuration from the environment.
    ///
    /// Reads `DATA_DIR` and `MAX_TAG_LENGTH`; anything unset keeps its default.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Config` if `MAX_TAG_LENGTH` is not a positive integer.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Config` if `MAX_TAG_LENGTH` is not a positive integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = lookup("DATA_DIR").filter(|d| !d.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(raw) = lookup("MAX_TAG_LENGTH") {
            config.max_tag_length = raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| TableError::Config(format!("MAX_TAG_LENGTH: {raw:?}")))?;
        }

        Ok(config)
    }

    /// Build the sanitizer described by this configuration.
    #[must_use]
    pub const fn sanitizer(&self) -> TagSanitizer {
        TagSanitizer::new(self.max_tag_length)
    }
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            max_tag_length: Self::default_max_tag_length(),
            data_dir: None,
            log_filter: Self::default_log_filter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let config = TablesConfig::default();
        assert_eq!(config.max_tag_length, 100);
        assert!(config.data_dir.is_none());
        assert_eq!(config.log_filter, "info,hanabi=debug");
    }

    #[test]
    fn from_env_overrides() {
        let config =
            TablesConfig::from_lookup(lookup(&[("DATA_DIR", "/data"), ("MAX_TAG_LENGTH", "40")]))
                .unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/data")));
        assert_eq!(config.max_tag_length, 40);
    }

    #[test]
    fn invalid_max_tag_length() {
        let result = TablesConfig::from_lookup(lookup(&[("MAX_TAG_LENGTH", "0")]));
        assert!(matches!(result, Err(TableError::Config(_))));
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: TablesConfig = serde_json::from_str(r#"{"data_dir": "/var/hanabi"}"#).unwrap();
        assert_eq!(config.max_tag_length, 100);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/hanabi")));
    }
}
