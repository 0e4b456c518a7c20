use std::sync::Arc;

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use parking_lot::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};

use super::{DocumentBackend, Fields};
use crate::error::RemoteError;

const FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
enum FeedEvent {
    Changed(Option<Fields>),
    Failed(RemoteError),
}

#[derive(Debug)]
struct Shared {
    record: RwLock<Option<Fields>>,
    failure: RwLock<Option<RemoteError>>,
    feed: broadcast::Sender<FeedEvent>,
}

/// In-process remote record
///
/// Clones share the same record, so one clone can be handed to
/// [`RemoteSync`](super::RemoteSync) while another inspects or perturbs it.
#[derive(Debug, Clone)]
pub struct MemoryDocumentBackend {
    shared: Arc<Shared>,
}

impl MemoryDocumentBackend {
    /// Backend with no record
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                record: RwLock::new(None),
                failure: RwLock::new(None),
                feed,
            }),
        }
    }

    /// Current stored fields
    pub fn record(&self) -> Option<Fields> {
        self.shared.record.read().clone()
    }

    /// Delete the record and notify watchers
    pub fn delete(&self) {
        *self.shared.record.write() = None;
        let _ = self.shared.feed.send(FeedEvent::Changed(None));
    }

    /// Make every request fail with a transport error until cleared
    pub fn set_offline(&self, offline: bool) {
        self.fail_requests(offline.then(|| RemoteError::Transport("backend offline".into())));
    }

    /// Make every request fail with `failure`, or succeed again with `None`
    pub fn fail_requests(&self, failure: Option<RemoteError>) {
        *self.shared.failure.write() = failure;
    }

    /// Push `err` to every open feed
    pub fn fail_watchers(&self, err: RemoteError) {
        let _ = self.shared.feed.send(FeedEvent::Failed(err));
    }

    /// Number of open feeds
    pub fn watcher_count(&self) -> usize {
        self.shared.feed.receiver_count()
    }

    fn check(&self) -> Result<(), RemoteError> {
        match &*self.shared.failure.read() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MemoryDocumentBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DocumentBackend for MemoryDocumentBackend {
    async fn merge(&self, fields: Fields) -> Result<(), RemoteError> {
        self.check()?;
        let merged = {
            let mut record = self.shared.record.write();
            let stored = record.get_or_insert_with(Fields::new);
            for (key, value) in fields {
                stored.insert(key, value);
            }
            stored.clone()
        };
        let _ = self.shared.feed.send(FeedEvent::Changed(Some(merged)));
        Ok(())
    }

    async fn fetch(&self) -> Result<Option<Fields>, RemoteError> {
        self.check()?;
        Ok(self.record())
    }

    fn watch(&self) -> BoxStream<'static, Result<Option<Fields>, RemoteError>> {
        if let Err(err) = self.check() {
            return stream::once(async move { Err(err) }).boxed();
        }

        // Subscribe before reading so no change falls between the two.
        let rx = self.shared.feed.subscribe();
        let initial = self.record();

        let head = stream::once(async move { Ok(initial) });
        let tail = stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(FeedEvent::Changed(fields)) => return Some((Ok(fields), rx)),
                    Ok(FeedEvent::Failed(err)) => return Some((Err(err), rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "remote feed lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });
        head.chain(tail).boxed()
    }
}
