//! Remote document sync
//!
//! The whole tree lives in a single remote record:
//!
//! ```json
//! {
//!   "content": { ... },
//!   "lastModified": "2024-03-05T07:08:09.000Z",
//!   "version": "1.0.0",
//!   "debug": { "savedAt": "...", "sectionsCount": 10, "sections": ["hero", ...] }
//! }
//! ```
//!
//! Writes are top-level field merges: fields not named in a write keep their
//! stored values, and a written field (including `content`) replaces the
//! stored one wholesale.
//!
//! The wire is abstracted by [`DocumentBackend`]. [`MemoryDocumentBackend`]
//! keeps the record in process; [`HttpDocumentBackend`] talks to a JSON
//! document endpoint.

mod http;
mod memory;

pub use http::HttpDocumentBackend;
pub use memory::MemoryDocumentBackend;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_content::ContentTree;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{json, Value as JsonValue};
use tokio::task::JoinHandle;

use crate::clock::{iso8601, parse_iso8601, to_millis, Clock};
use crate::error::RemoteError;

/// Top-level fields of a remote record
pub type Fields = serde_json::Map<String, JsonValue>;

/// Collection holding the record when none is configured
pub const DEFAULT_COLLECTION: &str = "portfolio";

/// Record id when none is configured
pub const DEFAULT_DOCUMENT: &str = "main";

/// Version stamped on every push
pub const RECORD_VERSION: &str = "1.0.0";

/// Transport for the single remote record
#[async_trait::async_trait]
pub trait DocumentBackend: Send + Sync + fmt::Debug {
    /// Merge `fields` into the record, creating it if absent
    async fn merge(&self, fields: Fields) -> Result<(), RemoteError>;

    /// Current record, `None` if it does not exist
    async fn fetch(&self) -> Result<Option<Fields>, RemoteError>;

    /// Live feed of the record
    ///
    /// The first item is the record's state when the feed starts; later
    /// items follow each change. An `Err` item ends the useful life of the
    /// feed.
    fn watch(&self) -> BoxStream<'static, Result<Option<Fields>, RemoteError>>;
}

/// Decoded remote record
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    pub content: ContentTree,
    /// Raw `lastModified`, empty when the record has none
    pub last_modified: String,
    pub version: String,
}

/// `lastModified` and `version` of the remote record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub last_modified: String,
    pub version: String,
}

impl RemoteRecord {
    /// Decode record fields
    ///
    /// # Errors
    /// Returns [`RemoteError::Decode`] if `content` is missing or is not an
    /// object
    pub fn from_fields(mut fields: Fields) -> Result<Self, RemoteError> {
        let metadata = RemoteMetadata::from_fields(&fields);
        let content = fields
            .remove("content")
            .ok_or_else(|| RemoteError::Decode("record has no content".into()))?;
        let content =
            ContentTree::try_from(content).map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Self {
            content,
            last_modified: metadata.last_modified,
            version: metadata.version,
        })
    }

    /// Record fields without the content
    pub fn metadata(&self) -> RemoteMetadata {
        RemoteMetadata {
            last_modified: self.last_modified.clone(),
            version: self.version.clone(),
        }
    }
}

impl RemoteMetadata {
    fn from_fields(fields: &Fields) -> Self {
        let text = |key: &str| fields.get(key).and_then(JsonValue::as_str).map(str::to_string);
        Self {
            last_modified: text("lastModified").unwrap_or_default(),
            version: text("version").unwrap_or_else(|| RECORD_VERSION.to_string()),
        }
    }

    /// `last_modified` as a timestamp, if it parses
    pub fn last_modified_at(&self) -> Option<DateTime<Utc>> {
        parse_iso8601(&self.last_modified).ok()
    }
}

/// Push, pull and watch the remote record
#[derive(Debug, Clone)]
pub struct RemoteSync {
    backend: Arc<dyn DocumentBackend>,
    clock: Arc<dyn Clock>,
}

impl RemoteSync {
    /// Sync against `backend`, stamping pushes with `clock`
    pub fn new(backend: Arc<dyn DocumentBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Backend holding the remote record
    pub fn backend(&self) -> &Arc<dyn DocumentBackend> {
        &self.backend
    }

    /// Write `tree` as the record's content
    ///
    /// Missing known sections are logged but do not block the write. Returns
    /// the `lastModified` stamped on the record.
    ///
    /// # Errors
    /// Returns the backend's error; the remote record is then unchanged.
    pub async fn push(&self, tree: &ContentTree) -> Result<DateTime<Utc>, RemoteError> {
        let missing = tree.missing_sections();
        if !missing.is_empty() {
            let missing: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
            tracing::warn!(?missing, "pushing content with missing sections");
        }

        let now = to_millis(self.clock.now());
        let stamp = iso8601(now);
        let sections = tree.section_names();
        let mut fields = Fields::new();
        fields.insert("content".into(), tree.to_json());
        fields.insert("lastModified".into(), JsonValue::String(stamp.clone()));
        fields.insert("version".into(), JsonValue::String(RECORD_VERSION.into()));
        fields.insert(
            "debug".into(),
            json!({
                "savedAt": stamp,
                "sectionsCount": sections.len(),
                "sections": sections,
            }),
        );

        match self.backend.merge(fields).await {
            Ok(()) => {
                tracing::info!(sections = tree.len(), last_modified = %now, "content pushed");
                Ok(now)
            }
            Err(err) => {
                tracing::error!(error = %err, "content push failed");
                Err(err)
            }
        }
    }

    /// Fetch and decode the whole record
    ///
    /// # Errors
    /// Returns the backend's error or [`RemoteError::Decode`]
    pub async fn fetch_record(&self) -> Result<Option<RemoteRecord>, RemoteError> {
        self.backend
            .fetch()
            .await?
            .map(RemoteRecord::from_fields)
            .transpose()
    }

    /// Remote content, `None` if the record does not exist
    ///
    /// # Errors
    /// Returns the backend's error or [`RemoteError::Decode`]
    pub async fn pull(&self) -> Result<Option<ContentTree>, RemoteError> {
        let record = self.fetch_record().await?;
        match &record {
            Some(r) => tracing::info!(sections = r.content.len(), version = %r.version, "content pulled"),
            None => tracing::info!("no remote content"),
        }
        Ok(record.map(|r| r.content))
    }

    /// Remote `lastModified` and `version`, `None` if the record does not
    /// exist
    ///
    /// # Errors
    /// Returns the backend's error
    pub async fn metadata(&self) -> Result<Option<RemoteMetadata>, RemoteError> {
        Ok(self
            .backend
            .fetch()
            .await?
            .map(|fields| RemoteMetadata::from_fields(&fields)))
    }

    /// Whether the remote record exists
    ///
    /// # Errors
    /// Returns the backend's error
    pub async fn exists(&self) -> Result<bool, RemoteError> {
        Ok(self.backend.fetch().await?.is_some())
    }

    /// Forward the live feed to callbacks on a spawned task
    ///
    /// `on_change` receives the record (or `None` when it does not exist),
    /// first with the current state and then after each change. On the
    /// first failure, or if the feed ends, `on_error` fires once and
    /// forwarding stops.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe<F, E>(&self, on_change: F, on_error: E) -> RemoteSubscription
    where
        F: Fn(Option<RemoteRecord>) + Send + 'static,
        E: FnOnce(RemoteError) + Send + 'static,
    {
        let mut feed = self.backend.watch();
        let handle = tokio::spawn(async move {
            while let Some(item) = feed.next().await {
                let decoded = item.and_then(|fields| fields.map(RemoteRecord::from_fields).transpose());
                match decoded {
                    Ok(record) => {
                        tracing::debug!(present = record.is_some(), "remote delivery");
                        on_change(record);
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "remote subscription failed");
                        on_error(err);
                        return;
                    }
                }
            }
            tracing::debug!("remote feed ended");
            on_error(RemoteError::FeedClosed);
        });

        RemoteSubscription {
            handle,
            cancelled: AtomicBool::new(false),
        }
    }
}

/// Handle to a running remote subscription
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping a RemoteSubscription stops it"]
#[derive(Debug)]
pub struct RemoteSubscription {
    handle: JoinHandle<()>,
    cancelled: AtomicBool,
}

impl RemoteSubscription {
    /// Stop forwarding; calling again is a no-op
    pub fn unsubscribe(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.handle.abort();
            tracing::debug!("remote subscription cancelled");
        }
    }

    /// Whether deliveries can still arrive
    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst) && !self.handle.is_finished()
    }
}

impl Drop for RemoteSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap()
    }

    fn sync(backend: &MemoryDocumentBackend) -> RemoteSync {
        RemoteSync::new(Arc::new(backend.clone()), Arc::new(FixedClock(at())))
    }

    fn tree(first: &str) -> ContentTree {
        ContentTree::try_from(json!({"hero": {"title": {"first": first}}})).unwrap()
    }

    #[tokio::test]
    async fn push_then_pull() {
        let backend = MemoryDocumentBackend::new();
        let remote = sync(&backend);

        let stamped = remote.push(&tree("A")).await.unwrap();

        assert_eq!(stamped, at());
        assert_eq!(remote.pull().await.unwrap(), Some(tree("A")));
    }

    #[tokio::test]
    async fn push_writes_record_fields() {
        let backend = MemoryDocumentBackend::new();
        sync(&backend).push(&tree("A")).await.unwrap();

        let record = backend.record().unwrap();
        assert_eq!(record["lastModified"], json!("2024-03-05T07:08:09.000Z"));
        assert_eq!(record["version"], json!("1.0.0"));
        assert_eq!(record["debug"]["sectionsCount"], json!(1));
        assert_eq!(record["debug"]["sections"], json!(["hero"]));
    }

    #[tokio::test]
    async fn push_keeps_unrelated_fields() {
        let backend = MemoryDocumentBackend::new();
        let mut extra = Fields::new();
        extra.insert("owner".into(), json!("admin"));
        backend.merge(extra).await.unwrap();

        sync(&backend).push(&tree("A")).await.unwrap();

        assert_eq!(backend.record().unwrap()["owner"], json!("admin"));
    }

    #[tokio::test]
    async fn push_replaces_content_wholesale() {
        let backend = MemoryDocumentBackend::new();
        let remote = sync(&backend);
        remote
            .push(&ContentTree::try_from(json!({"about": {"title": "x"}})).unwrap())
            .await
            .unwrap();
        remote.push(&tree("A")).await.unwrap();

        assert_eq!(remote.pull().await.unwrap(), Some(tree("A")));
    }

    #[tokio::test]
    async fn pull_absent_record() {
        let remote = sync(&MemoryDocumentBackend::new());
        assert_eq!(remote.pull().await.unwrap(), None);
        assert!(!remote.exists().await.unwrap());
        assert_eq!(remote.metadata().await.unwrap(), None);
    }

    #[tokio::test]
    async fn metadata_defaults() {
        let backend = MemoryDocumentBackend::new();
        let mut fields = Fields::new();
        fields.insert("content".into(), json!({}));
        backend.merge(fields).await.unwrap();

        let meta = sync(&backend).metadata().await.unwrap().unwrap();
        assert_eq!(meta.last_modified, "");
        assert_eq!(meta.version, "1.0.0");
        assert_eq!(meta.last_modified_at(), None);
    }

    #[tokio::test]
    async fn metadata_after_push() {
        let backend = MemoryDocumentBackend::new();
        let remote = sync(&backend);
        remote.push(&tree("A")).await.unwrap();

        let meta = remote.metadata().await.unwrap().unwrap();
        assert_eq!(meta.last_modified_at(), Some(at()));
        assert!(remote.exists().await.unwrap());
    }

    #[tokio::test]
    async fn push_offline_fails() {
        let backend = MemoryDocumentBackend::new();
        backend.set_offline(true);

        let err = sync(&backend).push(&tree("A")).await.unwrap_err();

        assert!(err.is_retryable());
        backend.set_offline(false);
        assert!(backend.record().is_none());
    }

    #[tokio::test]
    async fn pull_record_without_content() {
        let backend = MemoryDocumentBackend::new();
        let mut fields = Fields::new();
        fields.insert("version".into(), json!("1.0.0"));
        backend.merge(fields).await.unwrap();

        assert!(matches!(sync(&backend).pull().await, Err(RemoteError::Decode(_))));
    }

    #[tokio::test]
    async fn subscribe_delivers_current_then_changes() {
        let backend = MemoryDocumentBackend::new();
        let remote = sync(&backend);
        remote.push(&tree("A")).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = remote.subscribe(
            move |record| {
                let _ = tx.send(record.map(|r| r.content));
            },
            |_| {},
        );

        assert_eq!(rx.recv().await.unwrap(), Some(tree("A")));
        remote.push(&tree("B")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Some(tree("B")));
        assert!(sub.is_active());
    }

    #[tokio::test]
    async fn subscribe_reports_absent_record() {
        let backend = MemoryDocumentBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = sync(&backend).subscribe(
            move |record| {
                let _ = tx.send(record.is_some());
            },
            |_| {},
        );
        assert_eq!(rx.recv().await, Some(false));
    }

    #[tokio::test]
    async fn subscription_error_fires_once_and_stops() {
        let backend = MemoryDocumentBackend::new();
        let remote = sync(&backend);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let sub = remote.subscribe(
            move |_| {
                let _ = tx.send(());
            },
            move |err| sink.lock().push(err),
        );
        rx.recv().await.unwrap();

        backend.fail_watchers(RemoteError::PermissionDenied("revoked".into()));
        for _ in 0..50 {
            if !sub.is_active() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(!sub.is_active());
        assert_eq!(
            *errors.lock(),
            vec![RemoteError::PermissionDenied("revoked".into())]
        );
        remote.push(&tree("B")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_stops_deliveries() {
        let backend = MemoryDocumentBackend::new();
        let remote = sync(&backend);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = remote.subscribe(
            move |record| {
                let _ = tx.send(record.is_some());
            },
            |_| {},
        );
        rx.recv().await.unwrap();

        sub.unsubscribe();
        sub.unsubscribe();
        remote.push(&tree("B")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!sub.is_active());
        assert!(rx.try_recv().is_err());
    }
}
