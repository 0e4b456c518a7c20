//! Content fingerprints
//!
//! Provides [`Fingerprint`], a Blake3 hash over the canonical JSON rendering
//! of a node. Mapping order does not affect the result.

use std::fmt::{self, Display, Formatter};

use crate::node::{ContentNode, Scalar};

/// 32-byte Blake3 hash of a node's canonical form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint a node
    #[must_use]
    pub fn of(node: &ContentNode) -> Self {
        let mut canonical = String::new();
        write_canonical(node, &mut canonical);
        Self(*blake3::hash(canonical.as_bytes()).as_bytes())
    }

    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Sorted-key JSON without whitespace
fn write_canonical(node: &ContentNode, out: &mut String) {
    match node {
        ContentNode::Scalar(Scalar::Null) => out.push_str("null"),
        ContentNode::Scalar(Scalar::Bool(b)) => out.push_str(if *b { "true" } else { "false" }),
        ContentNode::Scalar(Scalar::Number(n)) => out.push_str(&n.to_string()),
        ContentNode::Scalar(Scalar::String(s)) => write_json_string(s, out),
        ContentNode::Sequence(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        ContentNode::Mapping(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(key, out);
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

fn write_json_string(s: &str, out: &mut String) {
    // serde_json never fails on a plain string
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => out.push_str("\"\""),
    }
}
