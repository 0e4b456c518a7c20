//! Content store
//!
//! Owns the live [`ContentTree`] snapshot together with the dirty flag and
//! the last sync time, and notifies subscribers on every change.
//!
//! The store is an ordinary value: construct it with [`ContentStore::init`]
//! and hand references (usually an `Arc`) to whatever needs it. Persistence
//! and remote sync never hold their own copy; they receive snapshots from
//! [`ContentStore::snapshot`] and feed loaded trees back through
//! [`ContentStore::load`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use folio_content::{ContentNode, ContentPath, ContentTree, ContentUpdate, PathError};
use parking_lot::{Mutex, ReentrantMutex, RwLock};

type Listener = dyn Fn(&ContentTree) + Send + Sync;

/// Tree plus the revision it was taken at
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tree: ContentTree,
    pub revision: u64,
}

/// Dirty flag and sync bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStatus {
    pub dirty: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

#[derive(Debug)]
struct StoreState {
    tree: ContentTree,
    dirty: bool,
    last_synced_at: Option<DateTime<Utc>>,
    /// Bumped on every change to `tree`
    revision: u64,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Arc<Listener>)>,
}

/// Process-wide holder of the live content snapshot
pub struct ContentStore {
    seed: ContentTree,
    state: RwLock<StoreState>,
    /// Held across a commit and its notification so listeners see
    /// revisions in order
    commit_order: ReentrantMutex<()>,
    listeners: Arc<Mutex<Listeners>>,
}

impl ContentStore {
    /// Create a store holding `seed`, clean and never synced
    #[must_use]
    pub fn init(seed: ContentTree) -> Self {
        Self {
            state: RwLock::new(StoreState {
                tree: seed.clone(),
                dirty: false,
                last_synced_at: None,
                revision: 0,
            }),
            seed,
            commit_order: ReentrantMutex::new(()),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Drop every subscriber
    ///
    /// Outstanding [`Subscription`] handles become inert.
    pub fn teardown(&self) {
        let removed = {
            let mut listeners = self.listeners.lock();
            std::mem::take(&mut listeners.entries).len()
        };
        tracing::debug!(removed, "content store torn down");
    }

    /// Current snapshot
    #[inline]
    #[must_use]
    pub fn current(&self) -> ContentTree {
        self.state.read().tree.clone()
    }

    /// Current snapshot with its revision
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            tree: state.tree.clone(),
            revision: state.revision,
        }
    }

    /// Dirty flag and sync bookkeeping
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        let state = self.state.read();
        StoreStatus {
            dirty: state.dirty,
            last_synced_at: state.last_synced_at,
            revision: state.revision,
        }
    }

    /// Whether the snapshot has changes not yet saved or pushed
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    /// Time of the last successful save, push or load
    #[inline]
    #[must_use]
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_synced_at
    }

    /// Number of changes committed since init
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// The tree [`ContentStore::reset`] returns to
    #[inline]
    #[must_use]
    pub fn seed(&self) -> &ContentTree {
        &self.seed
    }

    /// Write `value` at a dotted path
    ///
    /// # Errors
    /// Returns error if `path` is malformed; the store is left unchanged.
    pub fn update(&self, path: &str, value: impl Into<ContentNode>) -> Result<(), PathError> {
        let path = ContentPath::parse(path)?;
        self.update_at(&path, value);
        Ok(())
    }

    /// Write `value` at a parsed path
    pub fn update_at(&self, path: &ContentPath, value: impl Into<ContentNode>) {
        let value = value.into();
        tracing::debug!(%path, kind = value.kind(), "content update");
        self.commit(|state| {
            state.tree = state.tree.set(path, value);
            state.dirty = true;
        });
    }

    /// Apply several writes as one change with one notification
    ///
    /// An empty list changes nothing and notifies nobody.
    pub fn update_many(&self, updates: &[ContentUpdate]) {
        if updates.is_empty() {
            return;
        }
        tracing::debug!(count = updates.len(), "content batch update");
        self.commit(|state| {
            state.tree = state.tree.set_many(updates);
            state.dirty = true;
        });
    }

    /// Restore the seed; clean and never synced
    pub fn reset(&self) {
        tracing::info!("content reset to seed");
        let seed = self.seed.clone();
        self.commit(|state| {
            state.tree = seed;
            state.dirty = false;
            state.last_synced_at = None;
        });
    }

    /// Replace the snapshot with imported content; marks dirty
    pub fn import(&self, tree: ContentTree) {
        tracing::info!(sections = tree.len(), "content imported");
        self.commit(|state| {
            state.tree = tree;
            state.dirty = true;
        });
    }

    /// Adopt a snapshot read from durable or remote storage
    ///
    /// The store becomes clean and `last_synced_at` is set to `synced_at`.
    pub fn load(&self, tree: ContentTree, synced_at: DateTime<Utc>) {
        tracing::info!(sections = tree.len(), %synced_at, "content loaded");
        self.commit(|state| {
            state.tree = tree;
            state.dirty = false;
            state.last_synced_at = Some(synced_at);
        });
    }

    /// Record that the snapshot taken at `revision` was persisted
    ///
    /// Clears the dirty flag only when nothing changed since `revision`;
    /// returns whether it did. `last_synced_at` is updated either way.
    pub fn mark_synced(&self, revision: u64, at: DateTime<Utc>) -> bool {
        let mut state = self.state.write();
        state.last_synced_at = Some(at);
        if state.revision == revision {
            state.dirty = false;
            true
        } else {
            tracing::debug!(
                saved = revision,
                current = state.revision,
                "store changed while persisting, staying dirty"
            );
            false
        }
    }

    /// Register a listener called with every new snapshot
    ///
    /// Listeners run synchronously on the mutating thread, after the store's
    /// lock is released, in subscription order. Commits from different
    /// threads notify in revision order. A listener that mutates the store
    /// supersedes the snapshot being delivered, and the remaining listeners
    /// only see the newer one.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ContentTree) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
            active: AtomicBool::new(true),
        }
    }

    /// Number of registered listeners
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().entries.len()
    }

    fn commit(&self, change: impl FnOnce(&mut StoreState)) {
        let _order = self.commit_order.lock();
        let (tree, revision) = {
            let mut state = self.state.write();
            change(&mut state);
            state.revision += 1;
            (state.tree.clone(), state.revision)
        };
        self.notify(&tree, revision);
    }

    fn notify(&self, tree: &ContentTree, revision: u64) {
        let listeners: Vec<Arc<Listener>> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            if self.state.read().revision != revision {
                tracing::trace!(revision, "snapshot superseded during notification");
                return;
            }
            listener(tree);
        }
    }
}

impl fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStore")
            .field("state", &*self.state.read())
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

/// Handle to a registered listener
///
/// [`Subscription::unsubscribe`] removes the listener; calling it again is a
/// no-op. Dropping the handle unsubscribes as well.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
    active: AtomicBool,
}

impl Subscription {
    /// Remove the listener
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }

    /// Whether the listener is still registered
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
            && self
                .listeners
                .upgrade()
                .is_some_and(|l| l.lock().entries.iter().any(|(id, _)| *id == self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active.load(Ordering::SeqCst))
            .finish()
    }
}
