// SPDX-License-Identifier: MIT OR Apache-2.0
//! Write-once named symbol tables.
//!
//! Each back-end declares six constant sets (actions, buttons, keys,
//! relations, roles, states) mapping fixed symbolic names to opaque
//! platform values.  A set is populated exactly once while the back-end
//! initialises, then sealed into an immutable bidirectional table.

use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Canonical name lists
// ---------------------------------------------------------------------------

/// Legal role names.
pub const ROLES: &[&str] = &[
    "invalid",
    "accelerator-label",
    "alert",
    "animation",
    "application",
    "arrow",
    "calendar",
    "canvas",
    "check-box",
    "check-menu-item",
    "color-chooser",
    "column-header",
    "combo-box",
    "desktop-frame",
    "dial",
    "dialog",
    "directory-pane",
    "drawing-area",
    "file-chooser",
    "filler",
    "font-chooser",
    "frame",
    "glass-pane",
    "html-container",
    "icon",
    "image",
    "internal-frame",
    "label",
    "layered-pane",
    "list",
    "list-item",
    "menu",
    "menu-bar",
    "menu-item",
    "option-pane",
    "page-tab",
    "page-tab-list",
    "panel",
    "password-text",
    "popup-menu",
    "progress-bar",
    "push-button",
    "radio-button",
    "radio-menu-item",
    "root-pane",
    "row-header",
    "scroll-bar",
    "scroll-pane",
    "separator",
    "slider",
    "spin-button",
    "split-pane",
    "status-bar",
    "table",
    "table-cell",
    "table-column-header",
    "table-row-header",
    "terminal",
    "text",
    "toggle-button",
    "tool-bar",
    "tool-tip",
    "tree",
    "tree-table",
    "unknown",
    "viewport",
    "window",
];

/// Legal state names.
pub const STATES: &[&str] = &[
    "ACTIVE",
    "ARMED",
    "BUSY",
    "CHECKED",
    "COLLAPSED",
    "DEFUNCT",
    "EDITABLE",
    "ENABLED",
    "EXPANDABLE",
    "EXPANDED",
    "FOCUSABLE",
    "FOCUSED",
    "HORIZONTAL",
    "ICONIFIED",
    "MODAL",
    "MULTI_LINE",
    "MULTISELECTABLE",
    "OPAQUE",
    "PRESSED",
    "RESIZABLE",
    "SELECTABLE",
    "SELECTED",
    "SENSITIVE",
    "SHOWING",
    "SINGLE_LINE",
    "STALE",
    "TRANSIENT",
    "VERTICAL",
    "VISIBLE",
];

/// Legal action names.
///
/// The synthetic `FOCUS` action is not listed here: it is fabricated by the
/// serialiser for focusable nodes and routed to `grab_focus`, never to the
/// back-end's action table.
pub const ACTIONS: &[&str] = &[
    "ACTIVATE",
    "CLICK",
    "EDIT",
    "EXPAND_OR_CONTRACT",
    "MENU",
    "PRESS",
    "RELEASE",
    "TOGGLE",
];

/// Legal mouse button names.
pub const BUTTONS: &[&str] = &["LEFT", "MIDDLE", "RIGHT"];

/// Legal relation names.
pub const RELATIONS: &[&str] = &[
    "CONTROLLED_BY",
    "CONTROLLER_FOR",
    "DESCRIBED_BY",
    "DESCRIPTION_FOR",
    "EMBEDDED_BY",
    "EMBEDS",
    "FLOWS_FROM",
    "FLOWS_TO",
    "LABEL_FOR",
    "LABELLED_BY",
    "MEMBER_OF",
    "NODE_CHILD_OF",
    "NODE_PARENT_OF",
    "PARENT_WINDOW_OF",
    "POPUP_FOR",
];

/// Legal symbolic key names.
pub const KEYS: &[&str] = &[
    "BACKSPACE",
    "TAB",
    "RETURN",
    "ESCAPE",
    "SPACE",
    "DELETE",
    "INSERT",
    "HOME",
    "END",
    "PAGE_UP",
    "PAGE_DOWN",
    "LEFT",
    "RIGHT",
    "UP",
    "DOWN",
    "F1",
    "F2",
    "F3",
    "F4",
    "F5",
    "F6",
    "F7",
    "F8",
    "F9",
    "F10",
    "F11",
    "F12",
    "SHIFT_L",
    "SHIFT_R",
    "CONTROL_L",
    "CONTROL_R",
    "ALT_L",
    "ALT_R",
    "SUPER_L",
    "MENU",
    "CAPS_LOCK",
    "NUM_LOCK",
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Misuse of a constant set.  Only reachable while a back-end initialises.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstantSetError {
    /// The name is not in the set's legal name list.
    #[error("'{set}' set has no item '{name}'")]
    UnknownName {
        /// Set name, e.g. `"Role"`.
        set: &'static str,
        /// The offending item name.
        name: String,
    },

    /// The slot was already assigned a value.
    #[error("'{name}' item of '{set}' set already initialized")]
    AlreadyInitialized {
        /// Set name.
        set: &'static str,
        /// The item name assigned twice.
        name: String,
    },
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Accumulates name/value assignments for one constant set.
///
/// Each legal name may be assigned at most once; sealing produces the
/// immutable [`ConstantSet`].  Names left unassigned simply do not appear
/// in the sealed table.
#[derive(Debug)]
pub struct ConstantSetBuilder {
    set: &'static str,
    legal: &'static [&'static str],
    slots: BTreeMap<&'static str, u64>,
}

impl ConstantSetBuilder {
    /// Start a builder for the set called `set` with the given legal names.
    #[must_use]
    pub fn new(set: &'static str, legal: &'static [&'static str]) -> Self {
        Self {
            set,
            legal,
            slots: BTreeMap::new(),
        }
    }

    /// Assign `value` to `name`.
    ///
    /// # Errors
    ///
    /// [`ConstantSetError::UnknownName`] if `name` is not legal for this
    /// set, [`ConstantSetError::AlreadyInitialized`] if it was already
    /// assigned.
    pub fn set(&mut self, name: &str, value: u64) -> Result<(), ConstantSetError> {
        let Some(&slot) = self.legal.iter().find(|&&legal| legal == name) else {
            return Err(ConstantSetError::UnknownName {
                set: self.set,
                name: name.to_owned(),
            });
        };
        if self.slots.contains_key(slot) {
            return Err(ConstantSetError::AlreadyInitialized {
                set: self.set,
                name: name.to_owned(),
            });
        }
        self.slots.insert(slot, value);
        Ok(())
    }

    /// Assign consecutive values `base, base+1, …` to every legal name.
    ///
    /// Convenience for adapters whose platform values are already dense.
    pub fn assign_sequential(&mut self, base: u64) -> Result<(), ConstantSetError> {
        for (offset, name) in self.legal.iter().enumerate() {
            self.set(name, base + offset as u64)?;
        }
        Ok(())
    }

    /// Freeze the assignments into an immutable [`ConstantSet`].
    #[must_use]
    pub fn seal(self) -> ConstantSet {
        let by_value = self.slots.iter().map(|(&name, &value)| (value, name)).collect();
        ConstantSet {
            set: self.set,
            legal: self.legal,
            by_name: self.slots,
            by_value,
        }
    }
}

// ---------------------------------------------------------------------------
// Sealed set
// ---------------------------------------------------------------------------

/// An immutable bidirectional name/value table.
#[derive(Debug, Clone)]
pub struct ConstantSet {
    set: &'static str,
    legal: &'static [&'static str],
    by_name: BTreeMap<&'static str, u64>,
    by_value: BTreeMap<u64, &'static str>,
}

impl ConstantSet {
    /// An empty sealed set with the given legal names.
    #[must_use]
    pub fn empty(set: &'static str, legal: &'static [&'static str]) -> Self {
        ConstantSetBuilder::new(set, legal).seal()
    }

    /// The set's own name, e.g. `"State"`.
    #[must_use]
    pub fn set_name(&self) -> &'static str {
        self.set
    }

    /// Look up the value assigned to `name`.
    ///
    /// Returns `Ok(None)` for a legal but unassigned name — callers treat
    /// that the same as "unknown".
    ///
    /// # Errors
    ///
    /// [`ConstantSetError::UnknownName`] if `name` is not legal for this set.
    pub fn get(&self, name: &str) -> Result<Option<u64>, ConstantSetError> {
        if !self.legal.contains(&name) {
            return Err(ConstantSetError::UnknownName {
                set: self.set,
                name: name.to_owned(),
            });
        }
        Ok(self.by_name.get(name).copied())
    }

    /// Look up the value assigned to `name`, ignoring legality.
    ///
    /// Unknown and unassigned names both come back as `None`; used where
    /// the original protocol passes unknown names through untranslated.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<u64> {
        self.by_name.get(name).copied()
    }

    /// Translate an opaque value back to its symbolic name.
    #[must_use]
    pub fn reverse(&self, value: u64) -> Option<&'static str> {
        self.by_value.get(&value).copied()
    }

    /// Iterate over the assigned values.
    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.by_name.values().copied()
    }

    /// Number of assigned slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// `true` when nothing was assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl fmt::Display for ConstantSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.set, self.by_name.len(), self.legal.len())
    }
}

// ---------------------------------------------------------------------------
// Per-back-end table bundle
// ---------------------------------------------------------------------------

/// The six constant sets every back-end declares.
#[derive(Debug, Clone)]
pub struct ConstantTables {
    /// Action names.
    pub actions: ConstantSet,
    /// Mouse button names.
    pub buttons: ConstantSet,
    /// Symbolic key names.
    pub keys: ConstantSet,
    /// Relation names.
    pub relations: ConstantSet,
    /// Role names.
    pub roles: ConstantSet,
    /// State names.
    pub states: ConstantSet,
}

impl ConstantTables {
    /// Tables with the canonical legal name lists and nothing assigned.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            actions: ConstantSet::empty("Action", ACTIONS),
            buttons: ConstantSet::empty("Button", BUTTONS),
            keys: ConstantSet::empty("Key", KEYS),
            relations: ConstantSet::empty("Relation", RELATIONS),
            roles: ConstantSet::empty("Role", ROLES),
            states: ConstantSet::empty("State", STATES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_and_reverse() {
        let mut builder = ConstantSetBuilder::new("Button", BUTTONS);
        builder.set("LEFT", 1).unwrap();
        builder.set("RIGHT", 3).unwrap();
        let set = builder.seal();
        assert_eq!(set.get("LEFT").unwrap(), Some(1));
        assert_eq!(set.reverse(3), Some("RIGHT"));
        assert_eq!(set.reverse(7), None);
    }

    #[test]
    fn double_assignment_rejected() {
        let mut builder = ConstantSetBuilder::new("Button", BUTTONS);
        builder.set("LEFT", 1).unwrap();
        let err = builder.set("LEFT", 2).unwrap_err();
        assert_eq!(
            err,
            ConstantSetError::AlreadyInitialized {
                set: "Button",
                name: "LEFT".into()
            }
        );
    }

    #[test]
    fn unknown_name_rejected_on_set_and_get() {
        let mut builder = ConstantSetBuilder::new("Button", BUTTONS);
        assert!(matches!(
            builder.set("PEDAL", 9),
            Err(ConstantSetError::UnknownName { .. })
        ));
        let set = builder.seal();
        assert!(matches!(
            set.get("PEDAL"),
            Err(ConstantSetError::UnknownName { .. })
        ));
    }

    #[test]
    fn legal_but_unassigned_reads_as_unset() {
        let set = ConstantSet::empty("Button", BUTTONS);
        assert_eq!(set.get("MIDDLE").unwrap(), None);
        assert_eq!(set.lookup("MIDDLE"), None);
    }

    #[test]
    fn iteration_skips_unassigned() {
        let mut builder = ConstantSetBuilder::new("Button", BUTTONS);
        builder.set("MIDDLE", 2).unwrap();
        let set = builder.seal();
        assert_eq!(set.values().collect::<Vec<_>>(), vec![2]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn sequential_assignment_covers_every_name() {
        let mut builder = ConstantSetBuilder::new("State", STATES);
        builder.assign_sequential(100).unwrap();
        let set = builder.seal();
        assert_eq!(set.len(), STATES.len());
        assert_eq!(set.get("FOCUSABLE").unwrap(), set.lookup("FOCUSABLE"));
    }
}
