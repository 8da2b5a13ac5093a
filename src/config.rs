//! Checker configuration
//!
//! Loaded from an `argcheck.yaml` file; every field has a default, so an
//! empty file (or no file at all) gives the production settings.

use crate::arglist::MAX_NESTING_DEPTH;
use crate::check::EqualityPolicy;
use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the config file looked up by [`CheckerConfig::load_from_dir`]
pub const CONFIG_FILE_NAME: &str = "argcheck.yaml";

/// Settings for parsing and checking format strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CheckerConfig {
    /// Maximum nesting of compound specifiers (1..=1000)
    pub max_nesting_depth: usize,

    /// Whether `check` honours the caller's request for a lax comparison
    pub equality_policy: EqualityPolicy,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: MAX_NESTING_DEPTH,
            equality_policy: EqualityPolicy::ForceEquality,
        }
    }
}

impl CheckerConfig {
    /// Parse and validate a YAML config
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: CheckerConfig = serde_norway::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `argcheck.yaml` from a directory
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_file = dir.join(CONFIG_FILE_NAME);
        if !config_file.exists() {
            return Ok(None);
        }
        Self::load_file(&config_file).map(Some)
    }

    /// Load a config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_yaml(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_nesting_depth == 0 {
            return Err(Error::Config(
                "max_nesting_depth must be at least 1".to_string(),
            ));
        }
        if self.max_nesting_depth > MAX_NESTING_DEPTH {
            return Err(Error::Config(format!(
                "max_nesting_depth must not exceed {}",
                MAX_NESTING_DEPTH
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = CheckerConfig::default();
        assert_eq!(config.max_nesting_depth, 1000);
        assert_eq!(config.equality_policy, EqualityPolicy::ForceEquality);
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = CheckerConfig::from_yaml("equality_policy: caller_decides\n").unwrap();
        assert_eq!(config.equality_policy, EqualityPolicy::CallerDecides);
        assert_eq!(config.max_nesting_depth, 1000);
    }

    #[test]
    fn test_validate_rejects_bad_depth() {
        assert!(CheckerConfig::from_yaml("max_nesting_depth: 0").is_err());
        assert!(CheckerConfig::from_yaml("max_nesting_depth: 1001").is_err());
        assert!(CheckerConfig::from_yaml("max_nesting_depth: 10").is_ok());
    }

    #[test]
    fn test_load_from_dir() {
        let dir = TempDir::new().unwrap();
        assert!(CheckerConfig::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "max_nesting_depth: 5\n").unwrap();
        let config = CheckerConfig::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.max_nesting_depth, 5);

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "max_nesting_depth: [").unwrap();
        assert!(CheckerConfig::load_from_dir(dir.path()).is_err());
    }
}
