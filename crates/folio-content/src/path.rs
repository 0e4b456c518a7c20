//! Dotted paths for addressing within content trees
//!
//! Provides [`ContentPath`] for hierarchical addressing of nodes within a
//! [`ContentTree`](crate::ContentTree).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::section::Section;

/// Path within a content tree
///
/// An ordered, non-empty sequence of property names. The canonical text
/// form joins segments with `.`.
///
/// # Examples
/// - `["hero", "title", "first"]` → `hero.title.first`
/// - `["contact", "form", "submitButton"]` → `contact.form.submitButton`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentPath(Vec<String>);

impl ContentPath {
    /// Parse a dotted string into a path
    ///
    /// Segments are taken verbatim: no trimming and no character rules, so
    /// that rendering a parsed path gives back the input.
    ///
    /// # Errors
    /// - [`PathError::Empty`] if `raw` is empty
    /// - [`PathError::EmptySegment`] if any segment is empty (`a..b`, `.a`, `a.`)
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let segments = raw
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment {
                        raw: raw.to_string(),
                    })
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(segments))
    }

    /// Create path from segments
    ///
    /// # Errors
    /// Same rules as [`ContentPath::parse`]. A segment containing `.` is
    /// rejected because it could not survive a render/parse round trip.
    pub fn new<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if let Some(bad) = segments.iter().find(|s| s.is_empty() || s.contains('.')) {
            return Err(if bad.is_empty() {
                PathError::EmptySegment {
                    raw: segments.join("."),
                }
            } else {
                PathError::SeparatorInSegment(bad.clone())
            });
        }
        Ok(Self(segments))
    }

    /// Create path from a single segment
    ///
    /// # Errors
    /// Returns error if `segment` is empty or contains `.`
    #[inline]
    pub fn single(segment: impl Into<String>) -> Result<Self, PathError> {
        Self::new([segment.into()])
    }

    /// Render back to the dotted form
    #[inline]
    #[must_use]
    pub fn render(&self) -> String {
        self.0.join(".")
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments (always at least one)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with collections
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First segment (the top-level section key)
    #[inline]
    #[must_use]
    pub fn first(&self) -> &str {
        &self.0[0]
    }

    /// Last segment (the leaf key)
    #[inline]
    #[must_use]
    pub fn last(&self) -> &str {
        &self.0[self.0.len() - 1]
    }

    /// Parent path, `None` for single-segment paths
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() > 1 {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        } else {
            None
        }
    }

    /// Append a segment, returning new path
    ///
    /// # Errors
    /// Returns error if `segment` is empty or contains `.`
    pub fn child(&self, segment: impl Into<String>) -> Result<Self, PathError> {
        let segment = segment.into();
        if segment.is_empty() {
            return Err(PathError::EmptySegment {
                raw: format!("{}.", self.render()),
            });
        }
        if segment.contains('.') {
            return Err(PathError::SeparatorInSegment(segment));
        }
        let mut new = self.clone();
        new.0.push(segment);
        Ok(new)
    }

    /// Check if this path is a prefix of another
    ///
    /// # Examples
    /// - `hero.title` is prefix of `hero.title.first`
    /// - `hero.title` is NOT prefix of `hero.description`
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// The known section this path writes into, if any
    #[inline]
    #[must_use]
    pub fn section(&self) -> Option<Section> {
        self.first().parse().ok()
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Display for ContentPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromStr for ContentPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ContentPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Section> for ContentPath {
    fn from(section: Section) -> Self {
        Self(vec![section.as_str().to_string()])
    }
}

/// Errors related to content paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path has no segments at all
    #[error("path is empty")]
    Empty,

    /// Empty segment in path
    #[error("path '{raw}' contains an empty segment")]
    EmptySegment { raw: String },

    /// A segment given on its own contains the separator
    #[error("segment '{0}' contains the '.' separator")]
    SeparatorInSegment(String),
}
