//! Error types for mirror-store

use std::path::PathBuf;

use crate::store::SubscriptionId;

/// Result type for mirror-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while accessing a resource store
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} file at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Resource not found: {path}")]
    NotFound { path: String },

    #[error("Resource already exists: {path}")]
    AlreadyExists { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Unsupported query language: {language}")]
    UnsupportedQueryLanguage { language: String },

    #[error("Session is closed")]
    SessionClosed,

    #[error("Unknown subscription: {id}")]
    UnknownSubscription { id: SubscriptionId },

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(path: impl std::fmt::Display) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    pub fn invalid_path(path: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}
