//! Pool and registry configuration
//!
//! Settings are plain serde structs. Anything implementing [`Config`] can be
//! loaded from or saved to `.toml` and `.ron` files, picked by extension.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// File-backed configuration
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_str_as(&contents, ConfigFormat::from_path(path)?)
    }

    /// Parse configuration text in the given format
    fn from_str_as(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Render configuration text in the given format
    fn to_string_as(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        match format {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
            }
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = self.to_string_as(ConfigFormat::from_path(path)?)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.ron`
    Ron,
}

impl ConfigFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// What to do with a reused instance whose components no longer line up
/// with the template snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeMismatchPolicy {
    /// Restore the entries that still match and count the drift
    #[default]
    Degrade,
    /// Discard the instance and hand out a fresh clone instead
    Reject,
}

/// Per-pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Capacity reserved up front for the free and active lists
    pub initial_capacity: usize,
    /// Log a warning when disposed instances are found on a free list
    pub warn_on_stale_entries: bool,
    /// Handling of component-shape drift on reuse
    pub shape_mismatch: ShapeMismatchPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
            warn_on_stale_entries: true,
            shape_mismatch: ShapeMismatchPolicy::Degrade,
        }
    }
}

impl Config for PoolConfig {}

/// Registry-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// When false, instances are cloned and discarded directly
    pub pooling_enabled: bool,
    /// Log each stale entry purged by a sweep
    pub warn_on_sweep: bool,
    /// Settings for pools created by the registry
    pub pool: PoolConfig,
    /// Template name to pre-warm count
    pub prewarm: BTreeMap<String, usize>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            pooling_enabled: true,
            warn_on_sweep: true,
            pool: PoolConfig::default(),
            prewarm: BTreeMap::new(),
        }
    }
}

impl Config for RegistryConfig {}
