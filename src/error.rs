//! Error types for collection loading, mutation and persistence

use std::path::PathBuf;
use thiserror::Error;

/// Collection errors
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The persisted file does not match the platform schema
    #[error("Invalid collection file {path:?}: {message}")]
    Format { path: PathBuf, message: String },

    /// A playlist references a track that is not in the collection
    #[error("Playlist '{playlist}' references unknown track '{track_id}'")]
    Consistency { playlist: String, track_id: String },

    /// Platform name is not in the registry
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// A playlist required by an operation does not exist
    #[error("Playlist not found: {0}")]
    Lookup(String),

    /// Folder and leaf semantics were mixed on one playlist
    #[error("Playlist '{playlist}' is a {kind} and cannot {action}")]
    TypeKind {
        playlist: String,
        kind: &'static str,
        action: &'static str,
    },

    /// Malformed configuration or playlist structure
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Track numbers start at 1
    #[error("Invalid track number {number} for track '{track_id}'")]
    InvalidTrackNumber { track_id: String, number: u32 },

    /// An audio file could not be copied
    #[error("Failed to copy {from:?} to {to:?}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Worker pool could not be started
    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML writer error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl CollectionError {
    /// Shorthand for a format error on `path`
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for collection operations
pub type Result<T> = std::result::Result<T, CollectionError>;
