//! CLI-facing errors
//!
//! Each variant carries a stable code printed ahead of the message; every
//! one of them ends the process with exit code 1.

use std::io;

use thiserror::Error;

use crate::functions::FunctionError;
use crate::host::{ConfigError, HostError};

#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file or flags rejected
    #[error("FNHOST_CLI_CONFIG_ERROR: {0}")]
    Config(String),

    /// Writing output or setting up the runtime failed
    #[error("FNHOST_CLI_IO_ERROR: {0}")]
    Io(String),

    /// Discovery, arming or listening failed
    #[error("FNHOST_CLI_BOOT_FAILED: {0}")]
    BootFailed(String),
}

impl CliError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "FNHOST_CLI_CONFIG_ERROR",
            CliError::Io(_) => "FNHOST_CLI_IO_ERROR",
            CliError::BootFailed(_) => "FNHOST_CLI_BOOT_FAILED",
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Io(format!("JSON output: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<FunctionError> for CliError {
    fn from(e: FunctionError) -> Self {
        CliError::BootFailed(e.to_string())
    }
}

impl From<HostError> for CliError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::Config(e) => e.into(),
            other => CliError::BootFailed(other.to_string()),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code() {
        let err = CliError::BootFailed("no functions".into());
        assert_eq!(err.to_string(), "FNHOST_CLI_BOOT_FAILED: no functions");
        assert_eq!(err.code(), "FNHOST_CLI_BOOT_FAILED");
    }

    #[test]
    fn test_host_config_error_maps_to_config_code() {
        let err: CliError = HostError::Config(ConfigError::Invalid("port must be > 0".into())).into();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_function_error_maps_to_boot_failed() {
        let err: CliError = FunctionError::InvalidCron("'x'".into()).into();
        assert_eq!(err.code(), "FNHOST_CLI_BOOT_FAILED");
    }
}
