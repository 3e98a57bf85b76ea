use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunables for the import pipeline. Every field has a default, so an empty
/// file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// How many new rows a preview shows.
    pub preview_new_limit: usize,
    /// How many duplicate rows a preview shows.
    pub preview_duplicate_limit: usize,
    /// Duplicate lookups in flight at once.
    pub lookup_concurrency: usize,
    /// Rows classified at once.
    pub classify_concurrency: usize,
    /// Keyword rule table replacing the built-in one.
    pub rules_path: Option<PathBuf>,
    pub delegate: Option<DelegateSettings>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            preview_new_limit: 20,
            preview_duplicate_limit: 10,
            lookup_concurrency: 8,
            classify_concurrency: 4,
            rules_path: None,
            delegate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateSettings {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_delegate_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_delegate_timeout_ms() -> u64 {
    3000
}

impl DelegateSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ImportSettings {
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Zero would stall the buffered streams; treat it as one.
    pub fn lookup_concurrency(&self) -> usize {
        self.lookup_concurrency.max(1)
    }

    pub fn classify_concurrency(&self) -> usize {
        self.classify_concurrency.max(1)
    }
}
