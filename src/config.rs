//! Database configuration
//!
//! All settings have defaults; a YAML file may override any subset of them:
//!
//! ```yaml
//! maintain_indexes: true
//! use_index_by_default: true
//! pretty_json: false
//! workspace_dir: transaction_temp
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value outside its allowed range
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for one database handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Add newly created nodes to already defined indexes
    pub maintain_indexes: bool,
    /// Probe indexes for single-property MATCH unless the caller opts out
    pub use_index_by_default: bool,
    /// Write indented JSON
    pub pretty_json: bool,
    /// Workspace directory name inside the database directory
    pub workspace_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            maintain_indexes: true,
            use_index_by_default: true,
            pretty_json: true,
            workspace_dir: "transaction_temp".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Load from a YAML file; missing keys keep their defaults
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: DatabaseConfig = if text.trim().is_empty() {
            DatabaseConfig::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject workspace names that would escape the database directory
    pub fn validate(&self) -> ConfigResult<()> {
        let name = self.workspace_dir.trim();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                field: "workspace_dir",
                reason: format!("'{}' is not a plain directory name", self.workspace_dir),
            });
        }
        Ok(())
    }
}
