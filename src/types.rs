//! Core types shared by the tracer and the cluster stores.

use std::fmt;

/// Mesh node identifier as it appears in the input files.
pub type NodeId = u32;

/// Integer time cut-point, in the resolution of the activation table.
pub type Threshold = i64;

/// Dotted lineage path recording split history, e.g. `"0"`, `"0.1"`, `"2.0.3"`.
///
/// The first component is the index of the top-level cluster found at the
/// latest threshold; every further component is appended when a lineage
/// splits into several sub-waves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineageName(String);

impl LineageName {
    /// Name of the `index`-th top-level lineage.
    #[inline]
    pub fn root(index: usize) -> Self {
        Self(index.to_string())
    }

    /// Name of the `index`-th child produced when this lineage splits.
    #[inline]
    pub fn child(&self, index: usize) -> Self {
        Self(format!("{}.{}", self.0, index))
    }

    /// Parse a dotted path. Every component must be a non-empty run of digits.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = !s.is_empty()
            && s
                .split('.')
                .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
        valid.then(|| Self(s.to_owned()))
    }

    /// The lineage this one split from, if any.
    pub fn parent(&self) -> Option<Self> {
        self.0.rsplit_once('.').map(|(head, _)| Self(head.to_owned()))
    }

    /// Number of splits recorded in the name (0 for a top-level lineage).
    #[inline]
    pub fn depth(&self) -> usize {
        self.0.bytes().filter(|&b| b == b'.').count()
    }

    /// True if `self` is `other` or one of its descendants.
    pub fn descends_from(&self, other: &LineageName) -> bool {
        self.0 == other.0
            || (self.0.len() > other.0.len()
                && self.0.starts_with(&other.0)
                && self.0.as_bytes()[other.0.len()] == b'.')
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named cluster that is still being traced.
///
/// `nodes` is kept in ascending id order by the tracer; stores are only
/// required to preserve membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage {
    pub name: LineageName,
    pub nodes: Vec<NodeId>,
}

impl Lineage {
    pub fn new(name: LineageName, nodes: Vec<NodeId>) -> Self {
        Self { name, nodes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A finalized lineage: the traced source cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedCluster {
    pub name: LineageName,
    /// Node set at the last threshold where the lineage was still coherent.
    pub nodes: Vec<NodeId>,
    /// That threshold.
    pub last_threshold: Threshold,
}

impl ReducedCluster {
    #[inline]
    pub fn size(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lineage_names() {
        let root = LineageName::root(2);
        let child = root.child(0).child(3);
        assert_eq!(child.as_str(), "2.0.3");
        assert_eq!(child.depth(), 2);
        assert_eq!(child.parent(), Some(root.child(0)));
        assert_eq!(root.parent(), None);
        assert!(child.descends_from(&root));
        assert!(!LineageName::root(20).descends_from(&root));
    }

    #[test]
    fn test_lineage_name_parse() {
        assert_eq!(LineageName::parse("0.1"), Some(LineageName::root(0).child(1)));
        assert_eq!(LineageName::parse(""), None);
        assert_eq!(LineageName::parse("0..1"), None);
        assert_eq!(LineageName::parse("0.a"), None);
        assert_eq!(LineageName::parse("-"), None);
    }
}
