//! # Function Errors

use std::path::Path;

use thiserror::Error;

/// Result type for function operations
pub type FunctionResult<T> = Result<T, FunctionError>;

/// Function errors
#[derive(Debug, Clone, Error)]
pub enum FunctionError {
    #[error("Function not found: {0}")]
    NotFound(String),

    #[error("Malformed manifest {path}: {reason}")]
    Manifest { path: String, reason: String },

    #[error("Cannot load entry point for '{function}': {reason}")]
    EntryPoint { function: String, reason: String },

    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    #[error("Invalid cron expression: {0}")]
    InvalidCron(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FunctionError {
    /// Manifest at `path` could not be read or parsed
    pub fn manifest(path: &Path, reason: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Entry point of `function` could not be loaded
    pub fn entry_point(function: &str, reason: impl Into<String>) -> Self {
        Self::EntryPoint {
            function: function.to_string(),
            reason: reason.into(),
        }
    }

}

impl From<std::io::Error> for FunctionError {
    fn from(e: std::io::Error) -> Self {
        FunctionError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_error_names_path() {
        let err = FunctionError::manifest(Path::new("/fns/hello/function.json"), "EOF");
        assert!(err.to_string().contains("/fns/hello/function.json"));
        assert!(err.to_string().contains("EOF"));
    }
}
