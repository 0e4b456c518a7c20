//! Testing utilities for folio workspace
//!
//! Shared fixtures, path helpers and proptest strategies.

#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use folio_content::{ContentNode, ContentPath, ContentTree, ContentUpdate};
use proptest::prelude::*;
use serde_json::json;

/// Instant used by fixed clocks in tests: 2024-03-05T07:08:09.000Z
pub fn fixed_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap()
}

/// Parse a path, panicking on bad input
pub fn path(raw: &str) -> ContentPath {
    ContentPath::parse(raw).unwrap()
}

/// Build an update, panicking on a bad path
pub fn update(raw: &str, value: impl Into<ContentNode>) -> ContentUpdate {
    ContentUpdate::new(raw, value).unwrap()
}

/// Smallest seed: `hero.title.first = "A"`
pub fn minimal_seed() -> ContentTree {
    tree(json!({"hero": {"title": {"first": "A"}}}))
}

/// Seed with a few sections, a sequence and mixed scalars
pub fn sample_tree() -> ContentTree {
    tree(json!({
        "hero": {
            "title": {"first": "A", "last": "B"},
            "description": "Builder"
        },
        "skills": {
            "title": "Skills",
            "categories": [
                {"name": "Languages", "items": ["Rust", "TypeScript"]}
            ]
        },
        "contact": {
            "email": "a@example.com",
            "form": {"submitButton": {"text": "Send"}}
        },
        "about": {"kpiCards": [{"value": 10, "label": "Years"}], "visible": true}
    }))
}

/// Tree from a JSON object literal
pub fn tree(value: serde_json::Value) -> ContentTree {
    ContentTree::try_from(value).unwrap()
}

/// String value at `raw`, if any
pub fn text_at(tree: &ContentTree, raw: &str) -> Option<String> {
    tree.get(&path(raw))
        .and_then(ContentNode::as_str)
        .map(str::to_string)
}

/// One valid path segment
pub fn arb_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,7}"
}

/// Path of one to four segments
pub fn arb_path() -> impl Strategy<Value = ContentPath> {
    prop::collection::vec(arb_segment(), 1..=4)
        .prop_map(|segments| ContentPath::new(segments).unwrap())
}

/// Scalar leaf value
pub fn arb_scalar() -> impl Strategy<Value = ContentNode> {
    prop_oneof![
        Just(ContentNode::null()),
        any::<bool>().prop_map(ContentNode::from),
        any::<i64>().prop_map(ContentNode::from),
        "[ -~]{0,16}".prop_map(ContentNode::from),
    ]
}

/// Batch of writes
pub fn arb_updates() -> impl Strategy<Value = Vec<ContentUpdate>> {
    prop::collection::vec(
        (arb_path(), arb_scalar()).prop_map(|(path, value)| ContentUpdate::at(path, value)),
        0..8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_are_well_formed() {
        assert_eq!(text_at(&minimal_seed(), "hero.title.first").as_deref(), Some("A"));
        assert_eq!(
            text_at(&sample_tree(), "contact.form.submitButton.text").as_deref(),
            Some("Send")
        );
    }
}
