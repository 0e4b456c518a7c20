//! Folio Content Model
//!
//! Path-addressed, structurally shared content trees.
//!
//! # Core Concepts
//!
//! - [`ContentPath`]: dotted address of a node (`hero.title.first`)
//! - [`ContentNode`]: scalar, sequence, or mapping
//! - [`ContentTree`]: immutable snapshot of the whole aggregate; writes
//!   return a new snapshot and share every untouched subtree
//! - [`Section`]: the known top-level keys (guidance, not a schema)
//!
//! # Example
//!
//! ```rust
//! use folio_content::{ContentPath, ContentTree};
//!
//! let path: ContentPath = "hero.title.first".parse().unwrap();
//! let before = ContentTree::new();
//! let after = before.set(&path, "Ada");
//!
//! assert_eq!(after.get(&path).and_then(|n| n.as_str()), Some("Ada"));
//! assert!(before.get(&path).is_none());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod fingerprint;
mod node;
mod path;
mod section;
mod tree;

pub mod seed;

// Re-exports
pub use fingerprint::Fingerprint;
pub use node::{ContentNode, Mapping, Scalar};
pub use path::{ContentPath, PathError};
pub use section::{Section, UnknownSection};
pub use tree::{ContentTree, ContentUpdate, TreeError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
