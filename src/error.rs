//! Error types for artcache
//!
//! All modules use `ArtcacheResult<T>` as their return type.

use crate::store::ContentHash;
use crate::token::{ArtifactKind, TokenHash};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for artcache operations
pub type ArtcacheResult<T> = Result<T, ArtcacheError>;

/// All errors that can occur in artcache
#[derive(Error, Debug)]
pub enum ArtcacheError {
    // Index errors
    #[error("Token not found: {0}")]
    TokenNotFound(TokenHash),

    #[error("Invalid token: {0}")]
    InvalidVariant(String),

    #[error("Blob missing from content store: {0}")]
    BlobMissing(ContentHash),

    // Fetch errors
    #[error("No fetch adapter registered for {0} tokens")]
    NoAdapter(ArtifactKind),

    #[error("Fetch failed for {what}: {reason}")]
    Fetch { what: String, reason: String },

    #[error("HTTP request failed: {url}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    // Materialization errors
    #[error("Expected {expected} destination name(s), got {got}")]
    DestinationMismatch { expected: usize, got: usize },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl ArtcacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fetch error for adapter implementations
    pub fn fetch(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(url: impl Into<String>, source: ureq::Error) -> Self {
        Self::Http {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::TokenNotFound(_) => Some("Register it first with: artcache register <token>"),
            Self::InvalidVariant(_) => {
                Some("A token needs one of: \"path\" (repo file), \"id\" (gist), \"tag\" (release)")
            }
            Self::NoAdapter(_) => Some("Only repo file tokens have a built-in fetcher"),
            Self::BlobMissing(_) => Some("The cache directory was modified externally"),
            _ => None,
        }
    }
}
