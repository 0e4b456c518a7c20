//! Folio Store
//!
//! Holds the live content tree and moves it between process memory, a local
//! durable slot, export blobs and a remote document.
//!
//! # Components
//!
//! - [`ContentStore`]: current snapshot, dirty flag, last sync time and
//!   change subscribers
//! - [`DurablePersistence`]: saves the tree under one slot key
//! - [`Transfer`]: versioned JSON export and import
//! - [`RemoteSync`]: push, pull and live-follow the remote record
//! - [`ContentSession`]: all of the above wired together
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use folio_store::prelude::*;
//!
//! # async fn example() -> FolioResult<()> {
//! let config = FolioConfig::load_or_default("folio.toml")?;
//! let session = ContentSession::from_config(&config, Arc::new(SystemClock))?;
//! session.open().await;
//!
//! session.store().update("hero.title.first", "Ada")?;
//! session.save_local().await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod persistence;
pub mod remote;
pub mod session;
pub mod store;
pub mod transfer;

pub use clock::{iso8601, to_millis, Clock, FixedClock, SystemClock};
pub use config::{FolioConfig, RemoteConfig, StorageConfig, DEFAULT_CONFIG_FILE};
pub use error::{ConfigError, FolioError, FolioResult, ImportError, RemoteError, StorageError};
pub use persistence::{
    DurablePersistence, FileSlotStore, MemorySlotStore, SavedContent, SlotStore, DEFAULT_SLOT_KEY,
};
pub use remote::{
    DocumentBackend, Fields, HttpDocumentBackend, MemoryDocumentBackend, RemoteMetadata,
    RemoteRecord, RemoteSubscription, RemoteSync,
};
pub use session::ContentSession;
pub use store::{ContentStore, Snapshot, StoreStatus, Subscription};
pub use transfer::{export_blob, import_blob, Transfer, EXPORT_VERSION};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the folio store
    pub use crate::{
        Clock, ContentSession, ContentStore, FolioConfig, FolioError, FolioResult, SystemClock,
    };
    pub use folio_content::{ContentNode, ContentPath, ContentTree, ContentUpdate};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
