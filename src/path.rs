//! Structural paths into a schema tree
//!
//! A [`PathSpec`] names a node by the segments walked from the schema root.
//! Two schema versions are aligned node-for-node by comparing these paths.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Segment used for the item schema of an array
pub const ARRAY_ITEMS_SEGMENT: &str = "$items";

/// Segment used for the value schema of a map
pub const MAP_VALUES_SEGMENT: &str = "$values";

/// Ordered, immutable sequence of path segments
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathSpec(Vec<String>);

impl PathSpec {
    /// The empty path (the root of an anonymous schema)
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from any sequence of segments
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment, if any
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// A new path with `segment` appended
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Whether `self` is `other` or lies beneath it
    pub fn starts_with(&self, other: &PathSpec) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl From<Vec<String>> for PathSpec {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for PathSpec {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl<S: Into<String>> FromIterator<S> for PathSpec {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
