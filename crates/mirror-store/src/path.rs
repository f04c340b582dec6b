//! Normalized resource paths

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A resource path normalized to single forward slashes.
///
/// Backslashes become forward slashes, repeated separators collapse, and a
/// trailing separator is dropped (except for the root `/`). All prefix
/// comparisons in the mirroring code operate on this normalized form, so two
/// spellings of the same path always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath {
    /// Internal representation always uses single forward slashes
    inner: String,
}

impl ResourcePath {
    /// Create a new ResourcePath from any string-like input.
    pub fn new(path: impl AsRef<str>) -> Self {
        let raw = path.as_ref().replace('\\', "/");
        let absolute = raw.starts_with('/');

        let joined = raw
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");

        let inner = if absolute {
            format!("/{}", joined)
        } else {
            joined
        };
        Self { inner }
    }

    /// The tree root `/`.
    pub fn root() -> Self {
        Self {
            inner: "/".to_string(),
        }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Whether this is the tree root.
    pub fn is_root(&self) -> bool {
        self.inner == "/"
    }

    /// Whether the path starts at the tree root.
    pub fn is_absolute(&self) -> bool {
        self.inner.starts_with('/')
    }

    /// Whether the path is empty (blank input).
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Join this path with a relative segment.
    pub fn join(&self, segment: &str) -> Self {
        if self.inner.ends_with('/') {
            Self::new(format!("{}{}", self.inner, segment))
        } else {
            Self::new(format!("{}/{}", self.inner, segment))
        }
    }

    /// Get the parent path.
    ///
    /// The root and single-segment relative paths have no parent.
    pub fn parent(&self) -> Option<Self> {
        match self.inner.rfind('/') {
            Some(0) if self.inner.len() > 1 => Some(Self::root()),
            Some(0) => None,
            Some(idx) => Some(Self {
                inner: self.inner[..idx].to_string(),
            }),
            None => None,
        }
    }

    /// Get the last path segment.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() || self.is_empty() {
            return None;
        }
        self.inner.rsplit('/').next()
    }

    /// The string prefix every strict descendant of this path starts with.
    pub fn child_prefix(&self) -> String {
        if self.is_root() {
            self.inner.clone()
        } else {
            format!("{}/", self.inner)
        }
    }

    /// Whether `other` lies strictly below this path.
    pub fn is_ancestor_of(&self, other: &ResourcePath) -> bool {
        if self.is_empty() || self == other {
            return false;
        }
        other.inner.starts_with(&self.child_prefix())
    }

    /// Whether this path lies strictly below `other`.
    pub fn is_descendant_of(&self, other: &ResourcePath) -> bool {
        other.is_ancestor_of(self)
    }

    /// Whether this path equals `other` or lies below it.
    pub fn is_same_or_descendant_of(&self, other: &ResourcePath) -> bool {
        self == other || self.is_descendant_of(other)
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        self.inner.split('/').filter(|s| !s.is_empty()).count()
    }
}

impl AsRef<str> for ResourcePath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl std::fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for ResourcePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourcePath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&String> for ResourcePath {
    fn from(s: &String) -> Self {
        Self::new(s)
    }
}

impl Serialize for ResourcePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner)
    }
}

impl<'de> Deserialize<'de> for ResourcePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_separators() {
        assert_eq!(ResourcePath::new("/a//b/").as_str(), "/a/b");
        assert_eq!(ResourcePath::new("\\a\\b").as_str(), "/a/b");
        assert_eq!(ResourcePath::new("///").as_str(), "/");
        assert_eq!(ResourcePath::new("a/b").as_str(), "a/b");
        assert_eq!(ResourcePath::new("").as_str(), "");
    }

    #[test]
    fn test_parent_and_name() {
        let path = ResourcePath::new("/content/site/page");
        assert_eq!(path.parent(), Some(ResourcePath::new("/content/site")));
        assert_eq!(path.name(), Some("page"));
        assert_eq!(
            ResourcePath::new("/content").parent(),
            Some(ResourcePath::root())
        );
        assert_eq!(ResourcePath::root().parent(), None);
        assert_eq!(ResourcePath::root().name(), None);
    }

    #[test]
    fn test_ancestry_is_segment_aware() {
        let root = ResourcePath::new("/root/path");
        assert!(root.is_ancestor_of(&ResourcePath::new("/root/path/child")));
        assert!(!root.is_ancestor_of(&ResourcePath::new("/root/path2")));
        assert!(!root.is_ancestor_of(&root));
        assert!(ResourcePath::root().is_ancestor_of(&root));
        assert!(root.is_same_or_descendant_of(&root));
    }

    #[test]
    fn test_join() {
        assert_eq!(ResourcePath::root().join("a").as_str(), "/a");
        assert_eq!(ResourcePath::new("/a").join("b/c").as_str(), "/a/b/c");
    }
}
