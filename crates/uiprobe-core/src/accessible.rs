// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire records for serialised accessibility nodes.

use crate::path::ObjectPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A serialised accessibility node.
///
/// Only the `path` is always present.  Every other field is populated iff
/// the requester asked for it — an absent field means "not requested", not
/// "empty".  `children` is non-empty only when the request's dump depth
/// allowed recursion; each child's path extends the parent's by exactly one
/// index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Accessible {
    /// Address of this node from the registry root.
    pub path: ObjectPath,

    /// Accessible name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Accessible description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Symbolic role name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Number of direct children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,

    /// On-screen position in pixels, `(x, y)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<(i32, i32)>,

    /// On-screen size in pixels, `(width, height)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<(u32, u32)>,

    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Whether the text content is editable.  Only meaningful when `text`
    /// was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,

    /// Numeric value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    /// Available action names, in back-end order.  The synthetic `FOCUS`
    /// action, when present, is the first entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,

    /// Symbolic names of the states the node is in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<String>>,

    /// Attribute name/value pairs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,

    /// Relations to other nodes, possibly outside the dumped subtree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<Relation>>,

    /// Serialised direct children, present when the dump depth was not zero.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Accessible>,
}

impl Accessible {
    /// A record carrying nothing but its path.
    ///
    /// Used both as the "broken reference" marker and as the placeholder in
    /// `status=false` responses.
    #[must_use]
    pub fn bare(path: ObjectPath) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }

    /// A bare record that already carries serialised children.
    #[must_use]
    pub fn with_children(path: ObjectPath, children: Vec<Accessible>) -> Self {
        Self {
            path,
            children,
            ..Self::default()
        }
    }
}

/// A named relation from one node to a list of target nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Symbolic relation name.
    pub name: String,
    /// Paths of the relation targets.
    pub targets: Vec<ObjectPath>,
}

impl Relation {
    /// Build a relation record.
    #[must_use]
    pub fn new(name: impl Into<String>, targets: Vec<ObjectPath>) -> Self {
        Self {
            name: name.into(),
            targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_serialises_to_path_only() {
        let acc = Accessible::bare(ObjectPath::new(vec![0, 1]));
        let json = serde_json::to_value(&acc).unwrap();
        assert_eq!(json, serde_json::json!({ "path": [0, 1] }));
    }

    #[test]
    fn absent_fields_stay_absent_through_serde() {
        let mut acc = Accessible::bare(ObjectPath::new(vec![0]));
        acc.name = Some("app".into());
        acc.count = Some(3);
        let json = serde_json::to_string(&acc).unwrap();
        assert!(!json.contains("description"));
        assert!(!json.contains("states"));
        let back: Accessible = serde_json::from_str(&json).unwrap();
        assert_eq!(back, acc);
    }

    #[test]
    fn requested_but_empty_differs_from_absent() {
        let mut acc = Accessible::bare(ObjectPath::new(vec![0, 0]));
        acc.states = Some(Vec::new());
        let json = serde_json::to_string(&acc).unwrap();
        assert!(json.contains("\"states\":[]"));
    }

    #[test]
    fn relation_round_trip() {
        let rel = Relation::new(
            "LABELLED_BY",
            vec![ObjectPath::new(vec![0, 0, 2]), ObjectPath::new(vec![0, 1])],
        );
        let json = serde_json::to_string(&rel).unwrap();
        let back: Relation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rel);
    }
}
