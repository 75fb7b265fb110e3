//! Error types for tokenlint.
//!
//! Only the surrounding driver can fail (reading files, loading settings).
//! Lexing, symbol resolution and the rules themselves are infallible.

use std::path::PathBuf;
use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving an analysis.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read or access a file.
    #[error("IO error for {path}: {source}")]
    Io {
        /// Path to the file that caused the error.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to load or parse configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Generic IO error without path context.
    #[error("IO error: {0}")]
    IoGeneric(#[from] std::io::Error),
}

impl Error {
    /// Create an IO error for a specific file.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io("/src/missing.cpp", io_err);
        let msg = err.to_string();
        assert!(msg.contains("/src/missing.cpp"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::config("unknown variant `portability`");
        assert_eq!(err.to_string(), "Configuration error: unknown variant `portability`");
    }

    #[test]
    fn test_io_generic_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoGeneric(_)));
    }
}
