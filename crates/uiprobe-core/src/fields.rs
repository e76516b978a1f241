// SPDX-License-Identifier: MIT OR Apache-2.0
//! Field selections for accessibility dumps.

/// Which [`Accessible`](crate::Accessible) fields a dump should populate.
///
/// Built from the `include` list of a GET request; a SEARCH result is
/// always serialised with [`Fields::all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Fields {
    pub name: bool,
    pub description: bool,
    pub role: bool,
    pub count: bool,
    pub position: bool,
    pub size: bool,
    pub text: bool,
    pub value: bool,
    pub actions: bool,
    pub states: bool,
    pub attributes: bool,
    pub relations: bool,
}

impl Fields {
    /// Select every field.
    #[must_use]
    pub fn all() -> Self {
        Self {
            name: true,
            description: true,
            role: true,
            count: true,
            position: true,
            size: true,
            text: true,
            value: true,
            actions: true,
            states: true,
            attributes: true,
            relations: true,
        }
    }

    /// Select nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a selection from a request `include` list.
    ///
    /// Unrecognised names are ignored.
    pub fn from_include<S: AsRef<str>>(include: &[S]) -> Self {
        let mut fields = Self::none();
        for entry in include {
            match entry.as_ref() {
                "name" => fields.name = true,
                "description" => fields.description = true,
                "role" => fields.role = true,
                "count" => fields.count = true,
                "position" => fields.position = true,
                "size" => fields.size = true,
                "text" => fields.text = true,
                "value" => fields.value = true,
                "actions" => fields.actions = true,
                "states" => fields.states = true,
                "attributes" => fields.attributes = true,
                "relations" => fields.relations = true,
                _ => {}
            }
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_include_selects_named_fields() {
        let fields = Fields::from_include(&["name", "count"]);
        assert!(fields.name);
        assert!(fields.count);
        assert!(!fields.role);
        assert!(!fields.relations);
    }

    #[test]
    fn unknown_names_ignored() {
        let fields = Fields::from_include(&["name", "bogus", ""]);
        assert_eq!(fields, Fields::from_include(&["name"]));
    }

    #[test]
    fn all_selects_everything() {
        let fields = Fields::all();
        assert!(fields.name && fields.description && fields.role && fields.count);
        assert!(fields.position && fields.size && fields.text && fields.value);
        assert!(fields.actions && fields.states && fields.attributes && fields.relations);
    }
}
