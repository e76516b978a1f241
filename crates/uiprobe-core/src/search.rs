// SPDX-License-Identifier: MIT OR Apache-2.0
//! Search methods and predicate sets for structural tree search.

use serde::{Deserialize, Serialize};

/// Traversal strategy used by a SEARCH request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchMethod {
    /// Forward iteration over direct children.
    Simple,
    /// Reverse iteration over direct children.
    Backwards,
    /// Breadth-first iteration over all descendants.
    Deep,
}

impl SearchMethod {
    /// Parse a wire-level method string.
    ///
    /// Returns `None` for anything but the three known methods; the caller
    /// is expected to turn that into an `UnknownMethod` failure.
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "SIMPLE" => Some(Self::Simple),
            "BACKWARDS" => Some(Self::Backwards),
            "DEEP" => Some(Self::Deep),
            _ => None,
        }
    }
}

/// Predicates of a SEARCH request.
///
/// Every specified predicate must match for a candidate to pass.  String
/// predicates beginning with `&` are dot-all regular expressions that must
/// match the entire property value; all other strings compare literally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPredicates {
    /// Accessible name, literal or `&`-regex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Accessible description, literal or `&`-regex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Symbolic role name, literal only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Index within the parent — matched against the last path component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,

    /// Exact child count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,

    /// An action name the candidate must offer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// A relation name the candidate must carry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,

    /// A state name the candidate must be in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Text content, literal or `&`-regex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Zero-based index of the match to return.
    #[serde(default)]
    pub nth: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parsing() {
        assert_eq!(SearchMethod::parse("SIMPLE"), Some(SearchMethod::Simple));
        assert_eq!(
            SearchMethod::parse("BACKWARDS"),
            Some(SearchMethod::Backwards)
        );
        assert_eq!(SearchMethod::parse("DEEP"), Some(SearchMethod::Deep));
        assert_eq!(SearchMethod::parse("simple"), None);
        assert_eq!(SearchMethod::parse("SIDEWAYS"), None);
    }

    #[test]
    fn predicates_default_to_unset() {
        let preds: SearchPredicates = serde_json::from_str("{}").unwrap();
        assert_eq!(preds, SearchPredicates::default());
        assert_eq!(preds.nth, 0);
    }

    #[test]
    fn predicates_round_trip() {
        let preds = SearchPredicates {
            name: Some("&OK.*".into()),
            role: Some("push-button".into()),
            nth: 1,
            ..SearchPredicates::default()
        };
        let json = serde_json::to_string(&preds).unwrap();
        assert!(!json.contains("description"));
        let back: SearchPredicates = serde_json::from_str(&json).unwrap();
        assert_eq!(back, preds);
    }
}
