//! Error types for the folio store
//!
//! Provides error handling for:
//! - Local durable storage (slot read/write)
//! - Import of exported blobs
//! - Remote document sync
//! - Configuration loading
//!
//! Malformed paths surface as [`PathError`] from `folio-content`.

use std::path::PathBuf;

pub use folio_content::PathError;

/// Errors from the local durable slot
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error on the backing file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Write rejected by the slot's size limit
    #[error("storage quota exceeded: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded { needed: usize, limit: usize },

    /// Content could not be encoded
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Stored data exists but cannot be decoded
    #[error("slot '{key}' holds corrupt data: {reason}")]
    Corrupt { key: String, reason: String },
}

impl StorageError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create corrupt-data error for a slot key
    pub fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Errors importing an exported blob
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    /// Input is not valid JSON
    #[error("import data is not valid JSON: {0}")]
    InvalidJson(String),

    /// JSON is valid but has no `content` field
    #[error("import data has no content field")]
    MissingContent,

    /// `content` is present but is not an object
    #[error("import content must be an object, found {found}")]
    ContentNotMapping { found: &'static str },
}

/// Errors talking to the remote document store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Network or connection failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Unexpected status from the endpoint
    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Caller is not allowed to read or write the record
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Record could not be decoded
    #[error("failed to decode remote record: {0}")]
    Decode(String),

    /// Live feed ended
    #[error("remote feed closed")]
    FeedClosed,

    /// No remote endpoint configured
    #[error("no remote endpoint configured")]
    Unconfigured,
}

impl RemoteError {
    /// Whether a manual retry may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::FeedClosed => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Errors loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Combined folio error
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("import error: {0}")]
    Import(#[from] ImportError),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("seed error: {0}")]
    Seed(#[from] folio_content::seed::SeedError),
}

/// Result type alias for folio operations
pub type FolioResult<T> = Result<T, FolioError>;
