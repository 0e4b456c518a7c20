//! Content session
//!
//! Wires a [`ContentStore`] to local persistence, an optional remote record
//! and export/import. Every dependency is passed in; nothing is global.
//!
//! Commit policy: the dirty flag is cleared only after a save or push
//! succeeds, and only if the store did not change while it was in flight.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_content::ContentTree;

use crate::clock::Clock;
use crate::config::FolioConfig;
use crate::error::{FolioResult, ImportError, RemoteError, StorageError};
use crate::persistence::DurablePersistence;
use crate::remote::{RemoteSubscription, RemoteSync};
use crate::store::ContentStore;
use crate::transfer::Transfer;

/// Store plus everything that reads and writes it
#[derive(Debug, Clone)]
pub struct ContentSession {
    store: Arc<ContentStore>,
    persistence: DurablePersistence,
    remote: Option<RemoteSync>,
    transfer: Transfer,
    clock: Arc<dyn Clock>,
}

impl ContentSession {
    /// Session over `store` with local persistence only
    pub fn new(
        store: Arc<ContentStore>,
        persistence: DurablePersistence,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            persistence,
            remote: None,
            transfer: Transfer::new(Arc::clone(&clock)),
            clock,
        }
    }

    /// Attach a remote record
    #[must_use]
    pub fn with_remote(mut self, remote: RemoteSync) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Build a session from configuration
    ///
    /// # Errors
    /// Returns error if the configured seed cannot be loaded
    pub fn from_config(config: &FolioConfig, clock: Arc<dyn Clock>) -> FolioResult<Self> {
        let seed = config.load_seed()?;
        let store = Arc::new(ContentStore::init(seed));
        let session = Self::new(store, config.persistence(Arc::clone(&clock)), Arc::clone(&clock));
        Ok(match config.remote_sync(clock) {
            Some(remote) => session.with_remote(remote),
            None => session,
        })
    }

    /// Adopt locally saved content if there is any
    ///
    /// Unreadable or corrupt saved data is logged and the seed is kept.
    /// Returns whether saved content was loaded.
    pub async fn open(&self) -> bool {
        match self.load_local().await {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable saved content");
                false
            }
        }
    }

    /// The live store
    #[inline]
    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    #[inline]
    pub fn persistence(&self) -> &DurablePersistence {
        &self.persistence
    }

    #[inline]
    pub fn remote(&self) -> Option<&RemoteSync> {
        self.remote.as_ref()
    }

    fn remote_or_err(&self) -> Result<&RemoteSync, RemoteError> {
        self.remote.as_ref().ok_or(RemoteError::Unconfigured)
    }

    /// Save the current snapshot to the local slot
    ///
    /// # Errors
    /// Returns the slot's error; the store stays dirty
    pub async fn save_local(&self) -> Result<DateTime<Utc>, StorageError> {
        let snapshot = self.store.snapshot();
        let saved_at = self.persistence.save(&snapshot.tree).await?;
        self.store.mark_synced(snapshot.revision, saved_at);
        Ok(saved_at)
    }

    /// Replace the snapshot with locally saved content
    ///
    /// Returns `false` and leaves the store alone when nothing was saved.
    ///
    /// # Errors
    /// Returns error if the slot cannot be read or holds corrupt data
    pub async fn load_local(&self) -> Result<bool, StorageError> {
        match self.persistence.load().await? {
            Some(saved) => {
                self.store.load(saved.tree, saved.saved_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete locally saved content
    ///
    /// # Errors
    /// Returns the slot's error
    pub async fn clear_local(&self) -> Result<(), StorageError> {
        self.persistence.clear().await
    }

    /// Return the store to its seed
    pub fn reset(&self) {
        self.store.reset();
    }

    /// Write the current snapshot to the remote record
    ///
    /// # Errors
    /// Returns [`RemoteError::Unconfigured`] without a remote, or the
    /// remote's error; the store stays dirty
    pub async fn push(&self) -> Result<DateTime<Utc>, RemoteError> {
        let remote = self.remote_or_err()?;
        let snapshot = self.store.snapshot();
        let pushed_at = remote.push(&snapshot.tree).await?;
        self.store.mark_synced(snapshot.revision, pushed_at);
        Ok(pushed_at)
    }

    /// Replace the snapshot with the remote content
    ///
    /// Returns `false` and leaves the store alone when the remote record
    /// does not exist.
    ///
    /// # Errors
    /// Returns [`RemoteError::Unconfigured`] without a remote, or the
    /// remote's error
    pub async fn pull(&self) -> Result<bool, RemoteError> {
        let remote = self.remote_or_err()?;
        match remote.pull().await? {
            Some(tree) => {
                self.store.load(tree, self.clock.now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Export blob of the current snapshot
    ///
    /// # Errors
    /// Returns error if the tree cannot be encoded
    pub fn export(&self) -> Result<String, StorageError> {
        self.transfer.export(&self.store.current())
    }

    /// Replace the snapshot with an export blob's content; marks dirty
    ///
    /// # Errors
    /// Returns error if `raw` is not a valid blob; the store is unchanged
    pub fn import(&self, raw: &str) -> Result<(), ImportError> {
        let tree = self.transfer.import(raw)?;
        self.store.import(tree);
        Ok(())
    }

    /// Follow the remote record into the store
    ///
    /// Every delivered record replaces the snapshot as it arrives, unsaved
    /// local edits included, and leaves the store clean.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns [`RemoteError::Unconfigured`] without a remote
    pub fn watch_remote<E>(&self, on_error: E) -> Result<RemoteSubscription, RemoteError>
    where
        E: FnOnce(RemoteError) + Send + 'static,
    {
        let remote = self.remote_or_err()?;
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        Ok(remote.subscribe(
            move |record| {
                let Some(record) = record else {
                    tracing::debug!("remote record absent");
                    return;
                };
                apply_remote(&store, record.content, clock.now());
            },
            on_error,
        ))
    }
}

fn apply_remote(store: &ContentStore, tree: ContentTree, at: DateTime<Utc>) {
    if store.is_dirty() {
        tracing::warn!("remote change replaces unsaved local edits");
    }
    store.load(tree, at);
}
