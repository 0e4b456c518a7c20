//! Durable local persistence
//!
//! Saves and restores the whole content tree under one slot key. The slot
//! itself is abstracted by [`SlotStore`] so that a directory on disk and an
//! in-process map behave the same way.
//!
//! Slot layout:
//!
//! ```json
//! { "content": { "hero": { ... } }, "timestamp": "2024-03-05T07:08:09.000Z" }
//! ```

mod file;
mod memory;

pub use file::FileSlotStore;
pub use memory::MemorySlotStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_content::ContentTree;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::clock::{iso8601, parse_iso8601, to_millis, Clock};
use crate::error::StorageError;

/// Slot key used when none is configured
pub const DEFAULT_SLOT_KEY: &str = "portfolio_content_data";

/// Key/value slot backing durable persistence
#[async_trait::async_trait]
pub trait SlotStore: Send + Sync + std::fmt::Debug {
    /// Read the slot, `None` when it was never written
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the slot's contents
    async fn write(&self, key: &str, data: &str) -> Result<(), StorageError>;

    /// Delete the slot; removing an absent slot succeeds
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Tree read back from the slot with the time it was saved
#[derive(Debug, Clone, PartialEq)]
pub struct SavedContent {
    pub tree: ContentTree,
    pub saved_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct SlotRecord<'a> {
    content: &'a ContentTree,
    timestamp: String,
}

/// Saves whole trees to a [`SlotStore`]
#[derive(Debug, Clone)]
pub struct DurablePersistence {
    slots: Arc<dyn SlotStore>,
    clock: Arc<dyn Clock>,
    key: String,
}

impl DurablePersistence {
    /// Create persistence over `slots` using the default key
    pub fn new(slots: Arc<dyn SlotStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots,
            clock,
            key: DEFAULT_SLOT_KEY.to_string(),
        }
    }

    /// Use a different slot key
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Slot key in use
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write `tree` with the current time
    ///
    /// Returns the timestamp recorded in the slot.
    ///
    /// # Errors
    /// Returns error if encoding fails or the slot rejects the write; the
    /// previously saved content is then left in place.
    pub async fn save(&self, tree: &ContentTree) -> Result<DateTime<Utc>, StorageError> {
        let saved_at = to_millis(self.clock.now());
        let record = SlotRecord {
            content: tree,
            timestamp: iso8601(saved_at),
        };
        let data = serde_json::to_string(&record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        match self.slots.write(&self.key, &data).await {
            Ok(()) => {
                tracing::info!(key = %self.key, bytes = data.len(), %saved_at, "content saved");
                Ok(saved_at)
            }
            Err(err) => {
                tracing::error!(key = %self.key, error = %err, "content save failed");
                Err(err)
            }
        }
    }

    /// Read the last saved tree, `None` when nothing was saved
    ///
    /// # Errors
    /// Returns [`StorageError::Corrupt`] when the slot holds data that is not
    /// a saved tree, or the slot's own error when it cannot be read.
    pub async fn load(&self) -> Result<Option<SavedContent>, StorageError> {
        let Some(data) = self.slots.read(&self.key).await? else {
            tracing::debug!(key = %self.key, "no saved content");
            return Ok(None);
        };
        let saved = self.decode(&data)?;
        tracing::info!(key = %self.key, saved_at = %saved.saved_at, "content loaded from slot");
        Ok(Some(saved))
    }

    /// Delete the saved tree
    ///
    /// # Errors
    /// Returns the slot's error if removal fails
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.slots.remove(&self.key).await?;
        tracing::info!(key = %self.key, "saved content cleared");
        Ok(())
    }

    fn decode(&self, data: &str) -> Result<SavedContent, StorageError> {
        let corrupt = |reason: String| StorageError::corrupt(&self.key, reason);

        let mut value: JsonValue =
            serde_json::from_str(data).map_err(|e| corrupt(format!("invalid JSON: {e}")))?;
        let Some(record) = value.as_object_mut() else {
            return Err(corrupt("slot is not an object".into()));
        };
        let content = record
            .remove("content")
            .ok_or_else(|| corrupt("missing content".into()))?;
        let timestamp = record
            .get("timestamp")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| corrupt("missing timestamp".into()))?;

        let saved_at =
            parse_iso8601(timestamp).map_err(|e| corrupt(format!("bad timestamp: {e}")))?;
        let tree = ContentTree::try_from(content).map_err(|e| corrupt(e.to_string()))?;

        Ok(SavedContent { tree, saved_at })
    }
}
