//! Dotted paths that address every field of a message, e.g.
//! `FetchResponse.Body.Topics.Topics[0].Partitions.Partitions[0].ErrorCode`.

use std::fmt;

/// An ordered list of path segments. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Splits a dotted string into segments. The empty string is the root.
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::root();
        }
        Self {
            segments: dotted.split('.').map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Compares against a dotted string.
    pub fn is(&self, dotted: &str) -> bool {
        self.to_string() == dotted
    }

    /// The path with its last segment removed. The parent of the root is the root.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// # Panics
    ///
    /// Panics on the root path, which has no segments.
    pub fn last_segment(&self) -> &str {
        match self.segments.last() {
            Some(segment) => segment,
            None => panic!("Internal Error: last_segment called on the root path"),
        }
    }

    /// True when `other` is a strict ancestor. Every non-root path descends from the root.
    pub fn is_descendant_of(&self, other: &FieldPath) -> bool {
        self.segments.len() > other.segments.len() && self.segments.starts_with(&other.segments)
    }

    /// Two non-root paths with the same parent.
    pub fn is_sibling_of(&self, other: &FieldPath) -> bool {
        !self.is_root() && !other.is_root() && self.parent() == other.parent()
    }

    /// The longest shared segment prefix.
    pub fn common_ancestor(&self, other: &FieldPath) -> FieldPath {
        let segments = self
            .segments
            .iter()
            .zip(&other.segments)
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.clone())
            .collect();
        Self { segments }
    }

    /// The paths strictly between `self` and its ancestor `other`, nearest first.
    ///
    /// # Panics
    ///
    /// Panics when `self` does not descend from `other`.
    pub fn ancestors_until(&self, other: &FieldPath) -> Vec<FieldPath> {
        if !self.is_descendant_of(other) {
            panic!("Internal Error: {self} is not a descendant of {other}");
        }
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while current != *other {
            let next = current.parent();
            ancestors.push(current);
            current = next;
        }
        ancestors
    }

    /// The paths strictly between `self` and its descendant `other`, outermost first.
    pub fn descendants_until(&self, other: &FieldPath) -> Vec<FieldPath> {
        let mut descendants = other.ancestors_until(self);
        descendants.reverse();
        descendants
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}
