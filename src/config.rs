//! Inventory configuration
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration.

use crate::query_cache::DEFAULT_CACHE_CAPACITY;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid TOML for `InventoryConfig`
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The query cache must be able to hold at least one result
    #[error("Invalid cache capacity: must be greater than zero")]
    InvalidCacheCapacity,
}

/// Tunables of an `InventoryService`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InventoryConfig {
    /// Maximum number of memoized query results
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl InventoryConfig {
    /// Parses a configuration from a TOML document.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::InventoryConfig;
    ///
    /// let config = InventoryConfig::from_toml_str("cache_capacity = 32").unwrap();
    /// assert_eq!(config.cache_capacity, 32);
    ///
    /// let defaults = InventoryConfig::from_toml_str("").unwrap();
    /// assert_eq!(defaults, InventoryConfig::default());
    /// ```
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: InventoryConfig = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let document = std::fs::read_to_string(path)?;
        Self::from_toml_str(&document)
    }

    /// Checks the values that deserialization alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache_capacity_non_zero().map(|_| ())
    }

    pub(crate) fn cache_capacity_non_zero(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.cache_capacity).ok_or(ConfigError::InvalidCacheCapacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_zero_capacity_rejected() {
        let err = InventoryConfig::from_toml_str("cache_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCacheCapacity));
    }

    #[test]
    fn test_malformed_document_rejected() {
        let err = InventoryConfig::from_toml_str("cache_capacity = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache_capacity = 8").unwrap();

        let config = InventoryConfig::load(file.path()).unwrap();
        assert_eq!(config.cache_capacity, 8);
    }
}
