// aggregation-core/src/config.rs
// Options attached to the aggregate command, loadable from TOML

use crate::error::{AggregationError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Options for the aggregate command
///
/// ```toml
/// allow_disk_use = true
/// batch_size = 100
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationOptions {
    /// Let the server spill large sorts and groups to disk
    pub allow_disk_use: bool,

    /// Ask for the query plan instead of results
    pub explain: bool,

    /// Cursor batch size; `None` leaves it to the server
    pub batch_size: Option<u32>,
}

impl AggregationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow_disk_use(mut self, allow_disk_use: bool) -> Self {
        self.allow_disk_use = allow_disk_use;
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| AggregationError::Config(format!("Failed to parse options: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loaded aggregation options");
        Self::from_toml_str(&content)
    }

    /// Load options from `path`, falling back to defaults when the file is missing
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            warn!(path = %path.display(), "options file not found, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AggregationOptions::new();
        assert!(!options.allow_disk_use);
        assert!(!options.explain);
        assert_eq!(options.batch_size, None);
    }

    #[test]
    fn test_builder_setters() {
        let options = AggregationOptions::new()
            .with_allow_disk_use(true)
            .with_batch_size(50);
        assert!(options.allow_disk_use);
        assert_eq!(options.batch_size, Some(50));
    }

    #[test]
    fn test_parse_partial_toml() {
        let options = AggregationOptions::from_toml_str("explain = true\n").unwrap();
        assert!(options.explain);
        assert!(!options.allow_disk_use);
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let err = AggregationOptions::from_toml_str("allow_disk = true\n").unwrap_err();
        assert!(matches!(err, AggregationError::Config(_)));
    }
}
