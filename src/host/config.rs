//! Host configuration
//!
//! Read from a JSON file, then overridden by command line flags.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http_server::HttpServerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for one host instance
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Functions root; relative paths are taken from the install directory
    #[serde(default)]
    pub root: PathBuf,

    /// Listener address and function keys
    #[serde(flatten)]
    pub http: HttpServerConfig,

    /// Emit JSON log lines (default: false)
    #[serde(default)]
    pub log_json: bool,
}

impl HostConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.http.port = port;
        self
    }

    pub fn with_keys(mut self, keys: Vec<String>) -> Self {
        self.http.keys = keys;
        self
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("root must be set".into()));
        }
        if self.http.port == 0 {
            return Err(ConfigError::Invalid("port must be > 0".into()));
        }
        Ok(())
    }
}
