//! Content tree
//!
//! The structured content aggregate: a mapping at the root, addressed by
//! [`ContentPath`]. Every mutation returns a new tree; the receiver stays a
//! valid snapshot. Only the mappings along the written path are copied, all
//! other subtrees are shared between the old and the new tree.

use std::sync::Arc;

use serde::de::{Deserialize, Deserializer, Error as _};
use serde::ser::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::fingerprint::Fingerprint;
use crate::node::{ContentNode, Mapping};
use crate::path::{ContentPath, PathError};
use crate::section::Section;

/// Snapshot of the content aggregate
///
/// Cheap to clone. Equality is structural (mapping order is ignored).
#[derive(Debug, Clone, PartialEq)]
pub struct ContentTree {
    root: Arc<Mapping>,
}

/// A single path-addressed write
#[derive(Debug, Clone, PartialEq)]
pub struct ContentUpdate {
    pub path: ContentPath,
    pub value: ContentNode,
}

impl ContentUpdate {
    /// Create update from a dotted path
    ///
    /// # Errors
    /// Returns error if `path` is not a valid content path
    pub fn new(path: &str, value: impl Into<ContentNode>) -> Result<Self, PathError> {
        Ok(Self {
            path: ContentPath::parse(path)?,
            value: value.into(),
        })
    }

    /// Create update from an already parsed path
    #[must_use]
    pub fn at(path: ContentPath, value: impl Into<ContentNode>) -> Self {
        Self {
            path,
            value: value.into(),
        }
    }
}

impl ContentTree {
    /// Empty tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Arc::new(Mapping::new()),
        }
    }

    /// Wrap a root mapping
    #[inline]
    #[must_use]
    pub fn from_mapping(root: Mapping) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// Build a tree from a node
    ///
    /// # Errors
    /// Returns error if the node is not a mapping
    pub fn from_node(node: ContentNode) -> Result<Self, TreeError> {
        match node {
            ContentNode::Mapping(root) => Ok(Self { root }),
            other => Err(TreeError::RootNotMapping { found: other.kind() }),
        }
    }

    /// Parse a tree from JSON text
    ///
    /// # Errors
    /// Returns error if the text is not JSON or its root is not an object
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        let node: ContentNode =
            serde_json::from_str(json).map_err(|e| TreeError::InvalidJson(e.to_string()))?;
        Self::from_node(node)
    }

    /// Root mapping
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Mapping {
        &self.root
    }

    /// Root as a node (shares storage)
    #[inline]
    #[must_use]
    pub fn to_node(&self) -> ContentNode {
        ContentNode::Mapping(Arc::clone(&self.root))
    }

    /// Number of top-level keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Look up the node at `path`
    ///
    /// `None` means the location does not exist, which is normal for
    /// optional content. Scalars and sequences are not addressable by name,
    /// so meeting one before the last segment also yields `None`.
    #[must_use]
    pub fn get(&self, path: &ContentPath) -> Option<&ContentNode> {
        let (first, rest) = path.segments().split_first()?;
        let mut node = self.root.get(first.as_str())?;
        for segment in rest {
            node = node.field(segment)?;
        }
        Some(node)
    }

    /// Look up by dotted path
    ///
    /// # Errors
    /// Returns error if `path` is not a valid content path
    pub fn get_str(&self, path: &str) -> Result<Option<&ContentNode>, PathError> {
        let path = ContentPath::parse(path)?;
        Ok(self.get(&path))
    }

    /// Write `value` at `path`, returning the new tree
    ///
    /// Missing intermediate segments are created as empty mappings. An
    /// intermediate scalar or sequence is replaced by a mapping. The leaf is
    /// overwritten whatever it held before (last write wins, no merge).
    #[must_use]
    pub fn set(&self, path: &ContentPath, value: impl Into<ContentNode>) -> ContentTree {
        let mut root = Arc::clone(&self.root);
        write_path(Arc::make_mut(&mut root), path.segments(), value.into());
        ContentTree { root }
    }

    /// Write by dotted path
    ///
    /// # Errors
    /// Returns error if `path` is not a valid content path
    pub fn set_str(&self, path: &str, value: impl Into<ContentNode>) -> Result<ContentTree, PathError> {
        let path = ContentPath::parse(path)?;
        Ok(self.set(&path, value))
    }

    /// Apply updates in order, as if folding [`ContentTree::set`]
    ///
    /// Later updates to the same path win. The receiver is never touched, so
    /// no intermediate state is observable. An empty list returns a tree
    /// sharing the receiver's storage.
    #[must_use]
    pub fn set_many(&self, updates: &[ContentUpdate]) -> ContentTree {
        let mut root = Arc::clone(&self.root);
        for update in updates {
            write_path(Arc::make_mut(&mut root), update.path.segments(), update.value.clone());
        }
        ContentTree { root }
    }

    /// Node of a known section
    #[inline]
    #[must_use]
    pub fn section(&self, section: Section) -> Option<&ContentNode> {
        self.root.get(section.as_str())
    }

    /// Known sections absent from this tree
    #[must_use]
    pub fn missing_sections(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|s| !self.root.contains_key(s.as_str()))
            .collect()
    }

    /// Top-level keys in order
    #[must_use]
    pub fn section_names(&self) -> Vec<&str> {
        self.root.keys().map(String::as_str).collect()
    }

    /// Order-independent content hash
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.to_node())
    }

    /// Plain JSON value
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        self.to_node().to_json()
    }

    /// Pretty-printed JSON text
    ///
    /// # Errors
    /// Returns error if serialization fails (not expected for content trees)
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Copy-on-write descent: `make_mut` clones a mapping only while it is
/// still shared with another snapshot.
fn write_path(map: &mut Mapping, segments: &[String], value: ContentNode) {
    match segments {
        [] => {}
        [leaf] => {
            map.insert(leaf.clone(), value);
        }
        [head, rest @ ..] => {
            let slot = map
                .entry(head.clone())
                .or_insert_with(ContentNode::empty_mapping);
            if !matches!(slot, ContentNode::Mapping(_)) {
                *slot = ContentNode::empty_mapping();
            }
            if let ContentNode::Mapping(child) = slot {
                write_path(Arc::make_mut(child), rest, value);
            }
        }
    }
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ContentNode> for ContentTree {
    type Error = TreeError;

    fn try_from(node: ContentNode) -> Result<Self, Self::Error> {
        Self::from_node(node)
    }
}

impl TryFrom<JsonValue> for ContentTree {
    type Error = TreeError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        Self::from_node(ContentNode::from(value))
    }
}

impl Serialize for ContentTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.root.iter())
    }
}

impl<'de> Deserialize<'de> for ContentTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let node = ContentNode::deserialize(deserializer)?;
        ContentTree::from_node(node).map_err(D::Error::custom)
    }
}

/// Errors building a tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("content root must be a mapping, found {found}")]
    RootNotMapping { found: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn path(raw: &str) -> ContentPath {
        ContentPath::parse(raw).unwrap()
    }

    fn sample() -> ContentTree {
        ContentTree::try_from(json!({
            "hero": {"title": {"first": "A", "last": "Z"}, "description": "hi"},
            "skills": {"categories": ["rust", "go"]},
            "contact": {"email": "me@example.com"}
        }))
        .unwrap()
    }

    #[test]
    fn get_existing_leaf() {
        let tree = sample();
        assert_eq!(tree.get(&path("hero.title.first")), Some(&ContentNode::from("A")));
    }

    #[test]
    fn get_missing_is_none() {
        let tree = sample();
        assert_eq!(tree.get(&path("hero.subtitle")), None);
        assert_eq!(tree.get(&path("nope.deeper.still")), None);
    }

    #[test]
    fn get_through_scalar_or_sequence_is_none() {
        let tree = sample();
        assert_eq!(tree.get(&path("hero.description.more")), None);
        assert_eq!(tree.get(&path("skills.categories.0")), None);
    }

    #[test]
    fn set_overwrites_leaf() {
        let tree = sample().set(&path("hero.title.first"), "B");
        assert_eq!(tree.get(&path("hero.title.first")), Some(&ContentNode::from("B")));
        assert_eq!(tree.get(&path("hero.title.last")), Some(&ContentNode::from("Z")));
    }

    #[test]
    fn set_autovivifies_mappings() {
        let tree = ContentTree::new().set(&path("about.education.degree"), "BSc");
        assert!(tree.get(&path("about")).unwrap().as_mapping().is_some());
        assert!(tree.get(&path("about.education")).unwrap().as_mapping().is_some());
        assert_eq!(
            tree.get(&path("about.education.degree")).and_then(ContentNode::as_str),
            Some("BSc")
        );
    }

    #[test]
    fn set_replaces_non_mapping_intermediate() {
        let tree = sample().set(&path("skills.categories.primary"), "rust");
        assert_eq!(
            tree.get(&path("skills.categories")).map(ContentNode::kind),
            Some("mapping")
        );
        assert_eq!(
            tree.get(&path("skills.categories.primary")).and_then(ContentNode::as_str),
            Some("rust")
        );
    }

    #[test]
    fn set_replaces_whole_subtree_without_merge() {
        let tree = sample().set(&path("hero.title"), json!({"only": "one"}));
        assert_eq!(tree.get(&path("hero.title.first")), None);
        assert_eq!(tree.get(&path("hero.title.only")).and_then(ContentNode::as_str), Some("one"));
    }

    #[test]
    fn set_leaves_input_untouched() {
        let before = sample();
        let snapshot = before.to_json();
        let _after = before.set(&path("hero.title.first"), "changed");
        assert_eq!(before.to_json(), snapshot);
    }

    #[test]
    fn set_shares_untouched_sections() {
        let before = sample();
        let after = before.set(&path("hero.title.first"), "B");
        match (before.section(Section::Contact), after.section(Section::Contact)) {
            (Some(ContentNode::Mapping(a)), Some(ContentNode::Mapping(b))) => {
                assert!(Arc::ptr_eq(a, b));
            }
            _ => unreachable!("contact is a mapping in the sample"),
        }
    }

    #[test]
    fn set_keeps_key_position() {
        let tree = sample().set(&path("hero"), "flat");
        assert_eq!(tree.section_names(), vec!["hero", "skills", "contact"]);
    }

    #[test]
    fn set_str_rejects_invalid_path() {
        assert_eq!(sample().set_str("", 1).unwrap_err(), PathError::Empty);
        assert!(matches!(
            sample().set_str("a..b", 1),
            Err(PathError::EmptySegment { .. })
        ));
    }

    #[test]
    fn set_many_last_write_wins() {
        let updates = vec![
            ContentUpdate::new("hero.title.first", "one").unwrap(),
            ContentUpdate::new("hero.description", "text").unwrap(),
            ContentUpdate::new("hero.title.first", "two").unwrap(),
        ];
        let tree = sample().set_many(&updates);
        assert_eq!(tree.get(&path("hero.title.first")).and_then(ContentNode::as_str), Some("two"));
        assert_eq!(tree.get(&path("hero.description")).and_then(ContentNode::as_str), Some("text"));
    }

    #[test]
    fn set_many_empty_is_identity() {
        let tree = sample();
        assert_eq!(tree.set_many(&[]), tree);
    }

    #[test]
    fn missing_sections_reports_known_keys() {
        let tree = sample();
        let missing = tree.missing_sections();
        assert!(missing.contains(&Section::About));
        assert!(!missing.contains(&Section::Hero));
        assert_eq!(missing.len(), Section::ALL.len() - 3);
    }

    #[test]
    fn extra_keys_are_tolerated() {
        let tree = sample().set(&path("blog.posts"), json!([]));
        assert!(tree.get(&path("blog.posts")).is_some());
        assert_eq!(tree.section_names().len(), 4);
    }

    #[test]
    fn from_json_rejects_non_mapping_root() {
        assert_eq!(
            ContentTree::from_json("[1,2]"),
            Err(TreeError::RootNotMapping { found: "sequence" })
        );
        assert!(matches!(ContentTree::from_json("{oops"), Err(TreeError::InvalidJson(_))));
    }

    #[test]
    fn serde_roundtrip_keeps_order() {
        let tree = sample();
        let text = serde_json::to_string(&tree).unwrap();
        let back: ContentTree = serde_json::from_str(&text).unwrap();
        assert_eq!(back, tree);
        assert_eq!(back.section_names(), tree.section_names());
    }

    #[test]
    fn fingerprint_tracks_content() {
        let tree = sample();
        assert_eq!(tree.fingerprint(), tree.clone().fingerprint());
        assert_ne!(tree.fingerprint(), tree.set(&path("hero.description"), "x").fingerprint());
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9]{0,5}"
    }

    fn content_path() -> impl Strategy<Value = ContentPath> {
        proptest::collection::vec(segment(), 1..5).prop_map(|s| ContentPath::new(s).unwrap())
    }

    fn leaf() -> impl Strategy<Value = ContentNode> {
        prop_oneof![
            Just(ContentNode::null()),
            any::<bool>().prop_map(ContentNode::from),
            any::<i64>().prop_map(ContentNode::from),
            "[a-z ]{0,12}".prop_map(ContentNode::from),
        ]
    }

    fn tree() -> impl Strategy<Value = ContentTree> {
        proptest::collection::vec((content_path(), leaf()), 0..8).prop_map(|writes| {
            writes
                .into_iter()
                .fold(ContentTree::new(), |t, (p, v)| t.set(&p, v))
        })
    }

    proptest! {
        #[test]
        fn prop_get_after_set(t in tree(), p in content_path(), v in leaf()) {
            let updated = t.set(&p, v.clone());
            prop_assert_eq!(updated.get(&p), Some(&v));
        }

        #[test]
        fn prop_set_does_not_mutate_input(t in tree(), p in content_path(), v in leaf()) {
            let before = t.to_json();
            let _ = t.set(&p, v);
            prop_assert_eq!(t.to_json(), before);
        }

        #[test]
        fn prop_set_many_is_fold_of_set(
            t in tree(),
            writes in proptest::collection::vec((content_path(), leaf()), 0..6)
        ) {
            let updates: Vec<ContentUpdate> = writes
                .iter()
                .map(|(p, v)| ContentUpdate::at(p.clone(), v.clone()))
                .collect();
            let folded = writes.iter().fold(t.clone(), |acc, (p, v)| acc.set(p, v.clone()));
            prop_assert_eq!(t.set_many(&updates), folded);
        }
    }
}
