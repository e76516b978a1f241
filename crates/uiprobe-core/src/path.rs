// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integer paths addressing nodes of the accessibility forest.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of non-negative indices addressing a node from the
/// registry root.
///
/// The empty path denotes the registry root itself.  A path of length one
/// addresses a back-end's virtual root; the first component selects the
/// back-end, the second the top-level application within it, and every
/// further component a child index.  A path is only meaningful if each of
/// its prefixes resolves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectPath(Vec<u32>);

impl ObjectPath {
    /// The empty path addressing the registry root.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from raw components.
    #[must_use]
    pub fn new(components: impl Into<Vec<u32>>) -> Self {
        Self(components.into())
    }

    /// The raw components of this path.
    #[must_use]
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` for the registry root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The back-end index selected by this path, if any.
    #[must_use]
    pub fn backend_index(&self) -> Option<usize> {
        self.0.first().map(|&b| b as usize)
    }

    /// The last component — a node's index within its parent.
    #[must_use]
    pub fn index(&self) -> Option<u32> {
        self.0.last().copied()
    }

    /// The path of the `index`-th child of the node this path addresses.
    #[must_use]
    pub fn child(&self, index: u32) -> Self {
        let mut components = self.0.clone();
        components.push(index);
        Self(components)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for component in &self.0 {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl From<Vec<u32>> for ObjectPath {
    fn from(components: Vec<u32>) -> Self {
        Self(components)
    }
}

impl From<&[u32]> for ObjectPath {
    fn from(components: &[u32]) -> Self {
        Self(components.to_vec())
    }
}

impl FromIterator<u32> for ObjectPath {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn root_is_empty() {
        let root = ObjectPath::root();
        assert!(root.is_empty());
        assert_eq!(root.len(), 0);
        assert_eq!(root.backend_index(), None);
        assert_eq!(root.index(), None);
    }

    #[test]
    fn child_extends_by_one() {
        let path = ObjectPath::new(vec![0, 2]);
        let child = path.child(5);
        assert_eq!(child.components(), &[0, 2, 5]);
        assert_eq!(child.index(), Some(5));
        assert_eq!(child.backend_index(), Some(0));
    }

    #[test]
    fn display_slash_separated() {
        assert_eq!(ObjectPath::root().to_string(), "/");
        assert_eq!(ObjectPath::new(vec![1, 0, 3]).to_string(), "/1/0/3");
    }

    #[test]
    fn serde_is_a_plain_array() {
        let path = ObjectPath::new(vec![0, 1, 2]);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "[0,1,2]");
        let back: ObjectPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    proptest! {
        #[test]
        fn child_then_index_round_trips(components in proptest::collection::vec(0u32..1000, 0..6), index in 0u32..1000) {
            let path = ObjectPath::new(components.clone());
            let child = path.child(index);
            prop_assert_eq!(child.index(), Some(index));
            prop_assert_eq!(child.len(), components.len() + 1);
            prop_assert_eq!(&child.components()[..components.len()], components.as_slice());
        }
    }
}
