//! Engine configuration loaded from YAML

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Tunables for a [`GraphEngine`](crate::GraphEngine)
///
/// Every field is optional in the YAML file:
///
/// ```yaml
/// default_depth: 2
/// center_page_limit: 50
/// context_size: 5
/// db_path: /var/lib/trellis/graph.db
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Subgraph depth used when a caller does not pick one
    pub default_depth: u32,
    /// Page size of center listings
    pub center_page_limit: usize,
    /// Maximum number of neighbor labels attached to a center entry
    pub context_size: usize,
    /// SQLite database file; falls back to [`default_db_path`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_depth: 3,
            center_page_limit: 25,
            context_size: 5,
            db_path: None,
        }
    }
}

impl EngineConfig {
    /// Read a YAML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Configured database path, or the per-user default
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(default_db_path)
    }
}

/// Default database path (~/.local/share/trellis/trellis.db)
pub fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("trellis").join("trellis.db")
}
