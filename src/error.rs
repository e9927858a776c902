//! Custom error types for drive-backup
//!
//! This module defines the error hierarchy for the backup pipeline using
//! thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for drive-backup operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors for user-supplied settings
    #[error("Validation error: {0}")]
    Validation(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// No usable credential and no way to obtain one interactively
    #[error("Authorization required: {0}")]
    AuthRequired(String),

    /// Credential refresh or exchange failed
    #[error("Authorization error: {0}")]
    Auth(String),

    /// A single file could not be downloaded
    #[error("Failed to download {path}: {reason}")]
    Transfer { path: PathBuf, reason: String },

    /// Archive creation errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// Unexpected failure while running the pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl BackupError {
    /// Create a transfer error for a local destination path
    pub fn transfer(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Transfer {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if this error means interactive authorization is required
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthRequired(_))
    }

    /// Check if this is a per-file transfer error
    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::Transfer { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<reqwest::Error> for BackupError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<zip::result::ZipError> for BackupError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

/// Result type alias for drive-backup operations
pub type BackupResult<T> = Result<T, BackupError>;
