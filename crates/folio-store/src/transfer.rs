//! JSON export and import of the whole content tree
//!
//! Export blob:
//!
//! ```json
//! { "version": "1.0.0", "exported": "2024-03-05T07:08:09.000Z", "content": { ... } }
//! ```

use std::sync::Arc;

use folio_content::{ContentTree, TreeError};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::clock::{iso8601, Clock, SystemClock};
use crate::error::{ImportError, StorageError};

/// Format version written into every export
pub const EXPORT_VERSION: &str = "1.0.0";

#[derive(Serialize)]
struct ExportBlob<'a> {
    version: &'static str,
    exported: String,
    content: &'a ContentTree,
}

/// Render `tree` as a pretty-printed export blob stamped with `clock`
///
/// # Errors
/// Returns [`StorageError::Serialization`] if the tree cannot be encoded
pub fn export_blob(tree: &ContentTree, clock: &dyn Clock) -> Result<String, StorageError> {
    let blob = ExportBlob {
        version: EXPORT_VERSION,
        exported: iso8601(clock.now()),
        content: tree,
    };
    let text = serde_json::to_string_pretty(&blob)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    tracing::info!(bytes = text.len(), sections = tree.len(), "content exported");
    Ok(text)
}

/// Parse an export blob back into a tree
///
/// Only `content` is required. A missing or unknown `version` is accepted
/// with a warning.
///
/// # Errors
/// Returns error if `raw` is not JSON, has no `content`, or `content` is not
/// an object.
pub fn import_blob(raw: &str) -> Result<ContentTree, ImportError> {
    let value: JsonValue =
        serde_json::from_str(raw).map_err(|e| ImportError::InvalidJson(e.to_string()))?;
    let JsonValue::Object(mut blob) = value else {
        return Err(ImportError::MissingContent);
    };

    match blob.get("version").and_then(JsonValue::as_str) {
        Some(EXPORT_VERSION) => {}
        Some(other) => tracing::warn!(version = other, expected = EXPORT_VERSION, "unknown export version"),
        None => tracing::warn!("export blob has no version"),
    }

    let content = blob.remove("content").ok_or(ImportError::MissingContent)?;
    let tree = ContentTree::try_from(content).map_err(|e| match e {
        TreeError::RootNotMapping { found } => ImportError::ContentNotMapping { found },
        TreeError::InvalidJson(reason) => ImportError::InvalidJson(reason),
    })?;
    tracing::info!(sections = tree.len(), "content imported from blob");
    Ok(tree)
}

/// Export/import bound to one clock
#[derive(Debug, Clone)]
pub struct Transfer {
    clock: Arc<dyn Clock>,
}

impl Transfer {
    /// Transfer stamping exports with `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Encode `tree` as an export blob
    ///
    /// # Errors
    /// See [`export_blob`]
    pub fn export(&self, tree: &ContentTree) -> Result<String, StorageError> {
        export_blob(tree, self.clock.as_ref())
    }

    /// Decode an export blob
    ///
    /// # Errors
    /// See [`import_blob`]
    pub fn import(&self, raw: &str) -> Result<ContentTree, ImportError> {
        import_blob(raw)
    }
}

impl Default for Transfer {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
