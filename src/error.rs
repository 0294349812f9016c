//! Error types for reading and editing worker configuration files.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while locating, parsing, or mutating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file extension is not one of `.toml`, `.json`, `.jsonc`
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Malformed TOML content
    #[error("Failed to parse TOML in '{path}': {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Malformed JSON or JSONC content
    #[error("Failed to parse JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The edit could not be computed for this file
    #[error("Failed to update '{path}': {message}")]
    Write { path: PathBuf, message: String },

    /// A binding, variable, or environment definition was rejected
    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    /// The target of an add operation is already present
    #[error("{what} already exists")]
    AlreadyExists { what: String },

    /// The target of a delete operation is missing
    #[error("{what} not found")]
    NotFound { what: String },
}

impl ConfigError {
    /// Create an I/O error for a path
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a write error for a path
    pub fn write<M: Into<String>>(path: impl AsRef<Path>, message: M) -> Self {
        Self::Write {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create an invalid definition error
    pub fn invalid<M: Into<String>>(message: M) -> Self {
        Self::InvalidDefinition(message.into())
    }

    pub fn already_exists<W: Into<String>>(what: W) -> Self {
        Self::AlreadyExists { what: what.into() }
    }

    pub fn not_found<W: Into<String>>(what: W) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// True for malformed TOML or JSON content.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Toml { .. } | Self::Json { .. })
    }

    /// True when the underlying filesystem call failed.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
