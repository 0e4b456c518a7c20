//! Content nodes
//!
//! A node is a scalar, an ordered sequence of nodes, or a mapping from field
//! name to node. Containers share structure on clone: sequences are
//! persistent vectors and mappings sit behind an `Arc`, so cloning a tree is
//! cheap and a mutation only copies the containers along its path.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};
use serde_json::{Number, Value as JsonValue};

/// Field name → node, in insertion order
pub type Mapping = IndexMap<String, ContentNode>;

/// Leaf values
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

/// One node of a content tree
#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode {
    Scalar(Scalar),
    Sequence(im::Vector<ContentNode>),
    Mapping(Arc<Mapping>),
}

impl ContentNode {
    /// The `null` scalar
    #[inline]
    #[must_use]
    pub fn null() -> Self {
        ContentNode::Scalar(Scalar::Null)
    }

    /// An empty mapping
    #[inline]
    #[must_use]
    pub fn empty_mapping() -> Self {
        ContentNode::Mapping(Arc::new(Mapping::new()))
    }

    /// Build a mapping from `(key, value)` pairs, keeping their order
    pub fn mapping<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<ContentNode>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map: Mapping = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        ContentNode::Mapping(Arc::new(map))
    }

    /// Build a sequence from values
    pub fn sequence<V, I>(items: I) -> Self
    where
        V: Into<ContentNode>,
        I: IntoIterator<Item = V>,
    {
        ContentNode::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the variant, for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ContentNode::Scalar(Scalar::Null) => "null",
            ContentNode::Scalar(Scalar::Bool(_)) => "bool",
            ContentNode::Scalar(Scalar::Number(_)) => "number",
            ContentNode::Scalar(Scalar::String(_)) => "string",
            ContentNode::Sequence(_) => "sequence",
            ContentNode::Mapping(_) => "mapping",
        }
    }

    /// Whether this is the null scalar
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ContentNode::Scalar(Scalar::Null))
    }

    /// String scalar contents
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContentNode::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Boolean scalar value
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ContentNode::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Numeric scalar as `f64`
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ContentNode::Scalar(Scalar::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// Entries of a mapping node
    #[inline]
    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            ContentNode::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Items of a sequence node
    #[inline]
    #[must_use]
    pub fn as_sequence(&self) -> Option<&im::Vector<ContentNode>> {
        match self {
            ContentNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Field lookup on a mapping node
    #[inline]
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&ContentNode> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Convert to a plain JSON value
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        JsonValue::from(self)
    }
}

impl Default for ContentNode {
    fn default() -> Self {
        Self::null()
    }
}

impl From<JsonValue> for ContentNode {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => ContentNode::Scalar(Scalar::Null),
            JsonValue::Bool(b) => ContentNode::Scalar(Scalar::Bool(b)),
            JsonValue::Number(n) => ContentNode::Scalar(Scalar::Number(n)),
            JsonValue::String(s) => ContentNode::Scalar(Scalar::String(s)),
            JsonValue::Array(items) => {
                ContentNode::Sequence(items.into_iter().map(ContentNode::from).collect())
            }
            JsonValue::Object(map) => ContentNode::Mapping(Arc::new(
                map.into_iter()
                    .map(|(k, v)| (k, ContentNode::from(v)))
                    .collect(),
            )),
        }
    }
}

impl From<&ContentNode> for JsonValue {
    fn from(node: &ContentNode) -> Self {
        match node {
            ContentNode::Scalar(Scalar::Null) => JsonValue::Null,
            ContentNode::Scalar(Scalar::Bool(b)) => JsonValue::Bool(*b),
            ContentNode::Scalar(Scalar::Number(n)) => JsonValue::Number(n.clone()),
            ContentNode::Scalar(Scalar::String(s)) => JsonValue::String(s.clone()),
            ContentNode::Sequence(items) => {
                JsonValue::Array(items.iter().map(JsonValue::from).collect())
            }
            ContentNode::Mapping(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), JsonValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Scalar> for ContentNode {
    fn from(scalar: Scalar) -> Self {
        ContentNode::Scalar(scalar)
    }
}

impl From<&str> for ContentNode {
    fn from(s: &str) -> Self {
        ContentNode::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for ContentNode {
    fn from(s: String) -> Self {
        ContentNode::Scalar(Scalar::String(s))
    }
}

impl From<bool> for ContentNode {
    fn from(b: bool) -> Self {
        ContentNode::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for ContentNode {
    fn from(n: i64) -> Self {
        ContentNode::Scalar(Scalar::Number(n.into()))
    }
}

impl From<u64> for ContentNode {
    fn from(n: u64) -> Self {
        ContentNode::Scalar(Scalar::Number(n.into()))
    }
}

impl From<i32> for ContentNode {
    fn from(n: i32) -> Self {
        ContentNode::Scalar(Scalar::Number(n.into()))
    }
}

/// Non-finite values have no JSON form and become `null`.
impl From<f64> for ContentNode {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(ContentNode::null(), |n| {
            ContentNode::Scalar(Scalar::Number(n))
        })
    }
}

impl From<Vec<ContentNode>> for ContentNode {
    fn from(items: Vec<ContentNode>) -> Self {
        ContentNode::Sequence(items.into_iter().collect())
    }
}

impl From<Mapping> for ContentNode {
    fn from(map: Mapping) -> Self {
        ContentNode::Mapping(Arc::new(map))
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Number(n) => n.serialize(serializer),
            Scalar::String(s) => serializer.serialize_str(s),
        }
    }
}

impl Serialize for ContentNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ContentNode::Scalar(scalar) => scalar.serialize(serializer),
            ContentNode::Sequence(items) => serializer.collect_seq(items.iter()),
            ContentNode::Mapping(map) => serializer.collect_map(map.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for ContentNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = ContentNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ContentNode, E> {
        Ok(ContentNode::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ContentNode, E> {
        Ok(ContentNode::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ContentNode, E> {
        Ok(ContentNode::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ContentNode, E> {
        Ok(ContentNode::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ContentNode, E> {
        Ok(ContentNode::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ContentNode, E> {
        Ok(ContentNode::from(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<ContentNode, E> {
        Ok(ContentNode::null())
    }

    fn visit_unit<E: de::Error>(self) -> Result<ContentNode, E> {
        Ok(ContentNode::null())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<ContentNode, D::Error> {
        ContentNode::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ContentNode, A::Error> {
        let mut items = im::Vector::new();
        while let Some(item) = seq.next_element::<ContentNode>()? {
            items.push_back(item);
        }
        Ok(ContentNode::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ContentNode, A::Error> {
        let mut map = Mapping::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, ContentNode>()? {
            map.insert(key, value);
        }
        Ok(ContentNode::Mapping(Arc::new(map)))
    }
}
