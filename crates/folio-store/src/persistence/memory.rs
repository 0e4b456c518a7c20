use std::collections::HashMap;

use parking_lot::RwLock;

use super::SlotStore;
use crate::error::StorageError;

/// In-process slot map with an optional size limit
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    slots: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemorySlotStore {
    /// Empty store without a size limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes whose payload exceeds `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            slots: RwLock::default(),
            quota: Some(bytes),
        }
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

#[async_trait::async_trait]
impl SlotStore for MemorySlotStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.read().get(key).cloned())
    }

    async fn write(&self, key: &str, data: &str) -> Result<(), StorageError> {
        if let Some(limit) = self.quota {
            if data.len() > limit {
                return Err(StorageError::QuotaExceeded {
                    needed: data.len(),
                    limit,
                });
            }
        }
        self.slots.write().insert(key.to_string(), data.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.slots.write().remove(key);
        Ok(())
    }
}
