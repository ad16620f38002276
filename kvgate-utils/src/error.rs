//! Error types for kvgate
//!
//! Provides a unified error type used across all kvgate crates.

use std::path::PathBuf;

/// Main error type for kvgate operations
#[derive(Debug, thiserror::Error)]
pub enum KvgateError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Setup Errors ===

    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Failed to install signal handler: {0}")]
    Signal(std::io::Error),

    #[error("Invalid port {port}: must be at least {min}")]
    InvalidPort { port: u16, min: u16 },

    // === Operator Errors ===

    #[error("Control input error: {0}")]
    Control(std::io::Error),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    // === Store Errors ===

    #[error("Store unavailable: already torn down")]
    StoreUnavailable,

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KvgateError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using KvgateError
pub type Result<T> = std::result::Result<T, KvgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KvgateError::InvalidPort { port: 80, min: 1024 };
        assert_eq!(err.to_string(), "Invalid port 80: must be at least 1024");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: KvgateError = io_err.into();
        assert!(matches!(err, KvgateError::Io(_)));
    }
}
