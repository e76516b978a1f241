// SPDX-License-Identifier: MIT OR Apache-2.0
//! The accessibility back-end capability contract.

use crate::constants::ConstantTables;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Handles and argument types
// ---------------------------------------------------------------------------

/// An opaque, back-end-scoped handle to one accessible object.
///
/// Handles are assigned by the back-end and may be invalidated between
/// requests; any trait call taking a possibly stale handle is allowed to
/// fail with [`BackendError::StaleObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A key designator as received on the wire: either a raw key code or a
/// symbolic name to resolve through the back-end's key set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    /// Hardware key code.
    Code(i64),
    /// Symbolic key name, e.g. `"RETURN"`, or a single character.
    Symbol(String),
}

/// An action designator: a resolved platform value, or a name the back-end
/// should interpret itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionArg {
    /// Opaque value from the back-end's action set.
    Value(u64),
    /// Unresolved action name, passed through untranslated.
    Named(String),
}

/// A mouse button designator, mirroring [`ActionArg`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonArg {
    /// Opaque value from the back-end's button set.
    Value(u64),
    /// Unresolved button name, passed through untranslated.
    Named(String),
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by back-end adapters.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// A keyboard event received a key that is neither a code, a known
    /// symbolic name, nor a single character.
    #[error("invalid key: {0:?}")]
    BadKeyType(String),

    /// The object handle no longer refers to a live accessible.
    #[error("stale object handle {0}")]
    StaleObject(ObjectId),

    /// The adapter does not implement the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Any other adapter failure.
    #[error("{0}")]
    Failure(String),
}

/// Result alias for back-end calls.
pub type BackendResult<T> = Result<T, BackendError>;

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// The capability contract every platform adapter implements.
///
/// Calls are synchronous and may reach into external GUI toolkits; the
/// registry serialises them behind one mutex per back-end, so adapters do
/// not need to be thread-safe.  Methods take `&mut self` to make that
/// exclusivity explicit.
pub trait Accessibility: Send {
    /// The adapter's non-empty, unique name.  Registry order — and hence
    /// every wire path — is derived from sorting these names.
    fn name(&self) -> &str;

    /// The six constant tables this adapter populated at load time.
    fn constants(&self) -> &ConstantTables;

    // -- Tree navigation -------------------------------------------------

    /// The desktop root accessible.
    fn desktop(&mut self) -> BackendResult<ObjectId>;

    /// Number of direct children; registered applications when `parent` is
    /// absent.
    fn count_children(&mut self, parent: Option<ObjectId>) -> BackendResult<usize>;

    /// The `index`-th child, already range-checked by [`Accessibility::child`].
    fn child_at(&mut self, parent: Option<ObjectId>, index: usize)
        -> BackendResult<Option<ObjectId>>;

    /// Parent of `obj`, absent for a top-level object.
    fn parent(&mut self, obj: ObjectId) -> BackendResult<Option<ObjectId>>;

    /// Index such that `child(parent(obj), index)` resolves back to `obj`.
    fn index_in_parent(&mut self, obj: ObjectId) -> BackendResult<usize>;

    // -- Property readers ------------------------------------------------

    /// Accessible name.
    fn object_name(&mut self, obj: ObjectId) -> BackendResult<String>;

    /// Accessible description.
    fn description(&mut self, obj: ObjectId) -> BackendResult<String>;

    /// Opaque role value; translated through the role set by
    /// [`Accessibility::role_name`].
    fn role(&mut self, obj: ObjectId) -> BackendResult<u64>;

    /// Position in pixels.
    fn position(&mut self, obj: ObjectId) -> BackendResult<(i32, i32)>;

    /// Size in pixels.
    fn size(&mut self, obj: ObjectId) -> BackendResult<(u32, u32)>;

    /// Text content, absent when the object carries none.
    fn text(&mut self, obj: ObjectId) -> BackendResult<Option<String>>;

    /// Numeric value.
    fn value(&mut self, obj: ObjectId) -> BackendResult<f64>;

    /// Attribute name/value pairs.
    fn attributes(&mut self, obj: ObjectId) -> BackendResult<BTreeMap<String, String>>;

    // -- States ----------------------------------------------------------

    /// Opaque state values the object is in.
    fn states(&mut self, obj: ObjectId) -> BackendResult<Vec<u64>>;

    /// Whether the object is in the given state.
    fn in_state(&mut self, obj: ObjectId, state: u64) -> BackendResult<bool>;

    // -- Actions ---------------------------------------------------------

    /// Opaque action values the object offers.
    fn actions(&mut self, obj: ObjectId) -> BackendResult<Vec<u64>>;

    /// Perform an action.  Returns the back-end's success flag.
    fn do_action(&mut self, obj: ObjectId, action: &ActionArg) -> BackendResult<bool>;

    // -- Relations -------------------------------------------------------

    /// Opaque relation values the object carries.
    fn relations(&mut self, obj: ObjectId) -> BackendResult<Vec<u64>>;

    /// Targets of one relation.
    fn relation_targets(&mut self, obj: ObjectId, relation: u64)
        -> BackendResult<Vec<ObjectId>>;

    // -- Mutation --------------------------------------------------------

    /// Replace the object's text.  Returns the back-end's success flag.
    fn set_text(&mut self, obj: ObjectId, text: &str) -> BackendResult<bool>;

    /// Replace the object's value.  Returns the back-end's success flag.
    fn set_value(&mut self, obj: ObjectId, value: f64) -> BackendResult<bool>;

    /// Give the object input focus.
    fn grab_focus(&mut self, obj: ObjectId) -> BackendResult<bool>;

    // -- Input injection -------------------------------------------------

    /// Click at absolute coordinates.
    fn mouse_click(&mut self, x: i32, y: i32, button: &ButtonArg) -> BackendResult<()>;

    /// Double-click at absolute coordinates.
    fn mouse_double_click(&mut self, x: i32, y: i32, button: &ButtonArg) -> BackendResult<()>;

    /// Press a button at absolute coordinates.
    fn mouse_press(&mut self, x: i32, y: i32, button: &ButtonArg) -> BackendResult<()>;

    /// Release a button at absolute coordinates.
    fn mouse_release(&mut self, x: i32, y: i32, button: &ButtonArg) -> BackendResult<()>;

    /// Move the pointer to absolute coordinates.
    fn mouse_absolute_motion(&mut self, x: i32, y: i32) -> BackendResult<()>;

    /// Move the pointer by a relative offset.
    fn mouse_relative_motion(&mut self, x: i32, y: i32) -> BackendResult<()>;

    /// Emit a keyboard event for an already resolved key code.
    fn key_event(&mut self, keycode: i64, modifiers: &[i64]) -> BackendResult<()>;

    // -- Provided behaviour ----------------------------------------------

    /// Range-checked child access.
    ///
    /// Negative indices count from the end; anything out of range resolves
    /// to `Ok(None)` rather than an error.
    fn child(&mut self, parent: Option<ObjectId>, index: i64) -> BackendResult<Option<ObjectId>> {
        let count = self.count_children(parent)? as i64;
        if index >= count || index < -count {
            return Ok(None);
        }
        let index = if index < 0 { index + count } else { index };
        self.child_at(parent, index as usize)
    }

    /// Symbolic role name, `"UNKNOWN"` when the role value has no name.
    fn role_name(&mut self, obj: ObjectId) -> BackendResult<String> {
        let role = self.role(obj)?;
        Ok(self
            .constants()
            .roles
            .reverse(role)
            .unwrap_or("UNKNOWN")
            .to_owned())
    }

    /// Symbolic names of the object's actions, skipping values without one.
    fn action_names(&mut self, obj: ObjectId) -> BackendResult<Vec<String>> {
        let actions = self.actions(obj)?;
        let set = &self.constants().actions;
        Ok(actions
            .iter()
            .filter_map(|&action| set.reverse(action))
            .map(str::to_owned)
            .collect())
    }

    /// Symbolic names of the object's relations, skipping values without one.
    fn relation_names(&mut self, obj: ObjectId) -> BackendResult<Vec<String>> {
        let relations = self.relations(obj)?;
        let set = &self.constants().relations;
        Ok(relations
            .iter()
            .filter_map(|&relation| set.reverse(relation))
            .map(str::to_owned)
            .collect())
    }

    /// Resolve a [`KeySpec`] and emit the keyboard event.
    ///
    /// Symbolic names go through the key set; a single-character string not
    /// found there falls back to its code point, while a longer unknown
    /// string fails with [`BackendError::BadKeyType`].
    fn keyboard_event(&mut self, key: &KeySpec, modifiers: &[i64]) -> BackendResult<()> {
        let keycode = match key {
            KeySpec::Code(code) => *code,
            KeySpec::Symbol(symbol) => match self.constants().keys.lookup(symbol) {
                Some(code) => code as i64,
                None => {
                    let mut chars = symbol.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => c as i64,
                        _ => return Err(BackendError::BadKeyType(symbol.clone())),
                    }
                }
            },
        };
        self.key_event(keycode, modifiers)
    }
}
