//! Folio configuration
//!
//! Loaded from a TOML file; every field has a default so an absent file or
//! an empty one yields a working local-only setup.
//!
//! ```toml
//! seed = "content/seed.json"
//!
//! [storage]
//! dir = ".folio"
//! slot_key = "portfolio_content_data"
//!
//! [remote]
//! endpoint = "https://documents.example.com/v1"
//! collection = "portfolio"
//! document = "main"
//! token_env = "FOLIO_TOKEN"
//! poll_interval_ms = 5000
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use folio_content::seed::{default_seed, load_seed, SeedError};
use folio_content::ContentTree;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::ConfigError;
use crate::persistence::{DurablePersistence, FileSlotStore, DEFAULT_SLOT_KEY};
use crate::remote::{HttpDocumentBackend, RemoteSync, DEFAULT_COLLECTION, DEFAULT_DOCUMENT};

/// Config file looked up when none is given
pub const DEFAULT_CONFIG_FILE: &str = "folio.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// JSON file holding the seed tree; the built-in seed when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<PathBuf>,

    pub storage: StorageConfig,

    /// Remote record; local-only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
}

/// Local durable slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub slot_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".folio"),
            slot_key: DEFAULT_SLOT_KEY.to_string(),
        }
    }
}

/// Remote document endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub endpoint: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_document")]
    pub document: String,

    /// Environment variable holding a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_document() -> String {
    DEFAULT_DOCUMENT.to_string()
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

impl FolioConfig {
    /// Load from `path`, `None` if the file does not exist
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(Some(config))
    }

    /// Load from `path`, falling back to defaults if it does not exist
    ///
    /// # Errors
    /// See [`FolioConfig::load_from_path`]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::load_from_path(path)?.unwrap_or_default())
    }

    /// Render as TOML
    ///
    /// # Errors
    /// Returns the encoder's error
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Seed the store from a JSON file
    #[must_use]
    pub fn with_seed(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed = Some(path.into());
        self
    }

    /// Directory holding saved slots
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.dir = dir.into();
        self
    }

    /// Slot key for saved content
    #[must_use]
    pub fn with_slot_key(mut self, key: impl Into<String>) -> Self {
        self.storage.slot_key = key.into();
        self
    }

    /// Enable remote sync
    #[must_use]
    pub fn with_remote(mut self, remote: RemoteConfig) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Seed tree from the configured file, or the built-in seed
    ///
    /// # Errors
    /// Returns error if a configured seed file cannot be loaded
    pub fn load_seed(&self) -> Result<ContentTree, SeedError> {
        match &self.seed {
            Some(path) => load_seed(path),
            None => Ok(default_seed()),
        }
    }

    /// File-backed persistence for the configured slot
    pub fn persistence(&self, clock: Arc<dyn Clock>) -> DurablePersistence {
        let slots = Arc::new(FileSlotStore::new(&self.storage.dir));
        DurablePersistence::new(slots, clock).with_key(&self.storage.slot_key)
    }

    /// HTTP remote sync, `None` when no remote is configured
    pub fn remote_sync(&self, clock: Arc<dyn Clock>) -> Option<RemoteSync> {
        let backend = self.remote.as_ref()?.backend();
        Some(RemoteSync::new(Arc::new(backend), clock))
    }
}

impl RemoteConfig {
    /// Remote at `endpoint` with default collection and document
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: default_collection(),
            document: default_document(),
            token_env: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }

    /// Read the bearer token from environment variable `var`
    #[must_use]
    pub fn with_token_env(mut self, var: impl Into<String>) -> Self {
        self.token_env = Some(var.into());
        self
    }

    /// Polling interval for the HTTP feed
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Bearer token read from `token_env`, if set and present
    pub fn token(&self) -> Option<String> {
        let var = self.token_env.as_deref()?;
        match std::env::var(var) {
            Ok(token) if !token.is_empty() => Some(token),
            _ => {
                tracing::warn!(var, "token variable is unset");
                None
            }
        }
    }

    /// HTTP backend for this endpoint
    pub fn backend(&self) -> HttpDocumentBackend {
        let backend = HttpDocumentBackend::new(&self.endpoint, &self.collection, &self.document)
            .with_poll_interval(self.poll_interval());
        match self.token() {
            Some(token) => backend.with_token(token),
            None => backend,
        }
    }
}
