// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mock accessibility back-end for local testing.
//!
//! [`MockBackend`] serves a deterministic in-memory widget tree described
//! with [`MockNode`] builders.  Every externally observable call is
//! recorded in shared [`MockCounters`], which lets tests assert on
//! back-end call counts (for example to observe resolution-cache reuse).
//! The daemon registers [`MockBackend::sample`] at start so a freshly
//! built binary serves a small demo tree.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use uiprobe_backend::{
    Accessibility, ActionArg, BackendError, BackendResult, ButtonArg, ConstantSetBuilder,
    ConstantTables, ObjectId, ACTIONS, BUTTONS, KEYS, RELATIONS, ROLES, STATES,
};

// ---------------------------------------------------------------------------
// Call recording
// ---------------------------------------------------------------------------

/// A recorded mouse-injection call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouseCall {
    /// Which injection entry point ran (`"click"`, `"press"`, …).
    pub event: &'static str,
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// The button argument as the back-end received it, if any.
    pub button: Option<RecordedButton>,
}

/// The button argument a mouse call carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedButton {
    /// Resolved button-set value.
    Value(u64),
    /// Unresolved name passed through by the dispatcher.
    Named(String),
}

impl From<&ButtonArg> for RecordedButton {
    fn from(arg: &ButtonArg) -> Self {
        match arg {
            ButtonArg::Value(value) => Self::Value(*value),
            ButtonArg::Named(name) => Self::Named(name.clone()),
        }
    }
}

/// Shared call counters handed out by [`MockBackend::counters`].
///
/// Clone the `Arc` before boxing the back-end into a registry; the counts
/// stay observable afterwards.
#[derive(Debug, Default)]
pub struct MockCounters {
    /// Number of `child_at` lookups — the cost of a path resolution.
    pub child_lookups: AtomicUsize,
    /// Number of `set_text` calls.
    pub set_text_calls: AtomicUsize,
    /// Number of `set_value` calls.
    pub set_value_calls: AtomicUsize,
    /// Number of `do_action` calls.
    pub do_action_calls: AtomicUsize,
    /// Number of `grab_focus` calls.
    pub grab_focus_calls: AtomicUsize,
    /// Every mouse-injection call in order.
    pub mouse_calls: Mutex<Vec<MouseCall>>,
    /// Every keyboard event in order, `(keycode, modifiers)`.
    pub key_events: Mutex<Vec<(i64, Vec<i64>)>>,
}

impl MockCounters {
    /// Current `child_at` count.
    pub fn child_lookups(&self) -> usize {
        self.child_lookups.load(Ordering::SeqCst)
    }

    /// Snapshot of the recorded mouse calls.
    pub fn mouse_calls(&self) -> Vec<MouseCall> {
        self.mouse_calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Snapshot of the recorded keyboard events.
    pub fn key_events(&self) -> Vec<(i64, Vec<i64>)> {
        self.key_events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

// ---------------------------------------------------------------------------
// Tree description
// ---------------------------------------------------------------------------

/// Builder for one node of the mock tree.
#[derive(Debug, Clone, Default)]
pub struct MockNode {
    name: String,
    description: String,
    role: String,
    position: (i32, i32),
    size: (u32, u32),
    text: Option<String>,
    value: f64,
    attributes: BTreeMap<String, String>,
    states: Vec<String>,
    raw_states: Vec<u64>,
    actions: Vec<String>,
    relations: Vec<(String, Vec<String>)>,
    children: Vec<MockNode>,
    fail_child_count: bool,
}

impl MockNode {
    /// Start a node with the given accessible name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the role by symbolic name; unknown names read back as `UNKNOWN`.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Give the node text content.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the numeric value.
    #[must_use]
    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Set the on-screen position.
    #[must_use]
    pub fn position(mut self, x: i32, y: i32) -> Self {
        self.position = (x, y);
        self
    }

    /// Set the on-screen size.
    #[must_use]
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// Add symbolic states.
    #[must_use]
    pub fn states(mut self, states: &[&str]) -> Self {
        self.states.extend(states.iter().map(|s| (*s).to_owned()));
        self
    }

    /// Add a state value that has no symbolic name.
    #[must_use]
    pub fn raw_state(mut self, value: u64) -> Self {
        self.raw_states.push(value);
        self
    }

    /// Add symbolic actions.
    #[must_use]
    pub fn actions(mut self, actions: &[&str]) -> Self {
        self.actions.extend(actions.iter().map(|a| (*a).to_owned()));
        self
    }

    /// Add one attribute.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Add a relation to other nodes, addressed by their accessible names.
    #[must_use]
    pub fn relation(mut self, name: impl Into<String>, targets: &[&str]) -> Self {
        self.relations
            .push((name.into(), targets.iter().map(|t| (*t).to_owned()).collect()));
        self
    }

    /// Append a child node.
    #[must_use]
    pub fn child(mut self, child: MockNode) -> Self {
        self.children.push(child);
        self
    }

    /// Make `count_children` fail for this node, for degradation tests.
    #[must_use]
    pub fn failing_child_count(mut self) -> Self {
        self.fail_child_count = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

struct NodeData {
    name: String,
    description: String,
    role: u64,
    position: (i32, i32),
    size: (u32, u32),
    text: Option<String>,
    value: f64,
    attributes: BTreeMap<String, String>,
    states: Vec<u64>,
    actions: Vec<u64>,
    relations: Vec<(u64, Vec<ObjectId>)>,
    parent: Option<usize>,
    children: Vec<usize>,
    index_in_parent: usize,
    fail_child_count: bool,
}

/// In-memory accessibility back-end.
pub struct MockBackend {
    name: String,
    constants: ConstantTables,
    nodes: Vec<NodeData>,
    apps: Vec<usize>,
    editable_state: u64,
    counters: Arc<MockCounters>,
}

impl MockBackend {
    /// Build a back-end named `name` serving the given application trees.
    #[must_use]
    pub fn new(name: impl Into<String>, apps: Vec<MockNode>) -> Self {
        let constants = build_constants();
        let editable_state = constants
            .states
            .lookup("EDITABLE")
            .unwrap_or_default();
        let mut backend = Self {
            name: name.into(),
            constants,
            nodes: Vec::new(),
            apps: Vec::new(),
            editable_state,
            counters: Arc::new(MockCounters::default()),
        };
        // Slot 0 is the virtual desktop; applications hang below it but
        // report no parent, so relation target paths stop at the app level.
        backend.nodes.push(NodeData {
            name: "desktop".into(),
            description: String::new(),
            role: backend.constants.roles.lookup("desktop-frame").unwrap_or(0),
            position: (0, 0),
            size: (0, 0),
            text: None,
            value: 0.0,
            attributes: BTreeMap::new(),
            states: Vec::new(),
            actions: Vec::new(),
            relations: Vec::new(),
            parent: None,
            children: Vec::new(),
            index_in_parent: 0,
            fail_child_count: false,
        });
        let mut pending_relations = Vec::new();
        for (index, app) in apps.into_iter().enumerate() {
            let id = backend.insert(app, None, index, &mut pending_relations);
            backend.apps.push(id);
            backend.nodes[0].children.push(id);
        }
        for (from, relation_name, target_names) in pending_relations {
            let Some(value) = backend.constants.relations.lookup(&relation_name) else {
                continue;
            };
            let targets = target_names
                .iter()
                .filter_map(|target| backend.find_by_name(target))
                .map(|idx| ObjectId(idx as u64))
                .collect();
            backend.nodes[from].relations.push((value, targets));
        }
        backend
    }

    /// A small demo tree, registered by the daemon at start.
    #[must_use]
    pub fn sample() -> Self {
        Self::new(
            "mock",
            vec![MockNode::new("uiprobe-demo").role("application").child(
                MockNode::new("main-window")
                    .role("frame")
                    .size(800, 600)
                    .child(
                        MockNode::new("greeting")
                            .role("label")
                            .description("static greeting text"),
                    )
                    .child(
                        MockNode::new("input")
                            .role("text")
                            .text("")
                            .states(&["EDITABLE", "FOCUSABLE", "ENABLED", "VISIBLE"]),
                    )
                    .child(
                        MockNode::new("OK")
                            .role("push-button")
                            .actions(&["CLICK", "PRESS", "RELEASE"])
                            .states(&["FOCUSABLE", "ENABLED", "VISIBLE"]),
                    ),
            )],
        )
    }

    /// Shared call counters; clone the `Arc` before registering.
    #[must_use]
    pub fn counters(&self) -> Arc<MockCounters> {
        Arc::clone(&self.counters)
    }

    fn insert(
        &mut self,
        node: MockNode,
        parent: Option<usize>,
        index_in_parent: usize,
        pending_relations: &mut Vec<(usize, String, Vec<String>)>,
    ) -> usize {
        let id = self.nodes.len();
        let mut states: Vec<u64> = node
            .states
            .iter()
            .filter_map(|state| self.constants.states.lookup(state))
            .collect();
        states.extend(node.raw_states.iter().copied());
        let actions = node
            .actions
            .iter()
            .filter_map(|action| self.constants.actions.lookup(action))
            .collect();
        self.nodes.push(NodeData {
            name: node.name,
            description: node.description,
            role: self.constants.roles.lookup(&node.role).unwrap_or(0),
            position: node.position,
            size: node.size,
            text: node.text,
            value: node.value,
            attributes: node.attributes,
            states,
            actions,
            relations: Vec::new(),
            parent,
            children: Vec::new(),
            index_in_parent,
            fail_child_count: node.fail_child_count,
        });
        for (name, targets) in node.relations {
            pending_relations.push((id, name, targets));
        }
        for (child_index, child) in node.children.into_iter().enumerate() {
            let child_id = self.insert(child, Some(id), child_index, pending_relations);
            self.nodes[id].children.push(child_id);
        }
        id
    }

    fn find_by_name(&self, name: &str) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, node)| node.name == name)
            .map(|(idx, _)| idx)
    }

    fn node(&self, obj: ObjectId) -> BackendResult<&NodeData> {
        self.nodes
            .get(obj.0 as usize)
            .ok_or(BackendError::StaleObject(obj))
    }

    fn node_mut(&mut self, obj: ObjectId) -> BackendResult<&mut NodeData> {
        self.nodes
            .get_mut(obj.0 as usize)
            .ok_or(BackendError::StaleObject(obj))
    }

    fn has_state(&self, obj: ObjectId, state: u64) -> BackendResult<bool> {
        Ok(self.node(obj)?.states.contains(&state))
    }

    fn record_mouse(&self, event: &'static str, x: i32, y: i32, button: Option<&ButtonArg>) {
        self.counters
            .mouse_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(MouseCall {
                event,
                x,
                y,
                button: button.map(RecordedButton::from),
            });
    }
}

fn build_constants() -> ConstantTables {
    let mut tables = ConstantTables::empty();
    let mut roles = ConstantSetBuilder::new("Role", ROLES);
    // Platform values are arbitrary but dense; 0 is reserved so unknown
    // builder roles read back as UNKNOWN.
    roles.assign_sequential(1).unwrap_or_default();
    tables.roles = roles.seal();
    let mut states = ConstantSetBuilder::new("State", STATES);
    states.assign_sequential(100).unwrap_or_default();
    tables.states = states.seal();
    let mut actions = ConstantSetBuilder::new("Action", ACTIONS);
    actions.assign_sequential(200).unwrap_or_default();
    tables.actions = actions.seal();
    let mut relations = ConstantSetBuilder::new("Relation", RELATIONS);
    relations.assign_sequential(300).unwrap_or_default();
    tables.relations = relations.seal();
    let mut buttons = ConstantSetBuilder::new("Button", BUTTONS);
    buttons.assign_sequential(1).unwrap_or_default();
    tables.buttons = buttons.seal();
    let mut keys = ConstantSetBuilder::new("Key", KEYS);
    keys.assign_sequential(0xff00).unwrap_or_default();
    tables.keys = keys.seal();
    tables
}

impl Accessibility for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn constants(&self) -> &ConstantTables {
        &self.constants
    }

    fn desktop(&mut self) -> BackendResult<ObjectId> {
        Ok(ObjectId(0))
    }

    fn count_children(&mut self, parent: Option<ObjectId>) -> BackendResult<usize> {
        match parent {
            None => Ok(self.apps.len()),
            Some(obj) => {
                let node = self.node(obj)?;
                if node.fail_child_count {
                    return Err(BackendError::Failure(format!(
                        "child count unavailable for {obj}"
                    )));
                }
                Ok(node.children.len())
            }
        }
    }

    fn child_at(
        &mut self,
        parent: Option<ObjectId>,
        index: usize,
    ) -> BackendResult<Option<ObjectId>> {
        self.counters.child_lookups.fetch_add(1, Ordering::SeqCst);
        let child = match parent {
            None => self.apps.get(index).copied(),
            Some(obj) => self.node(obj)?.children.get(index).copied(),
        };
        Ok(child.map(|idx| ObjectId(idx as u64)))
    }

    fn parent(&mut self, obj: ObjectId) -> BackendResult<Option<ObjectId>> {
        Ok(self.node(obj)?.parent.map(|idx| ObjectId(idx as u64)))
    }

    fn index_in_parent(&mut self, obj: ObjectId) -> BackendResult<usize> {
        Ok(self.node(obj)?.index_in_parent)
    }

    fn object_name(&mut self, obj: ObjectId) -> BackendResult<String> {
        Ok(self.node(obj)?.name.clone())
    }

    fn description(&mut self, obj: ObjectId) -> BackendResult<String> {
        Ok(self.node(obj)?.description.clone())
    }

    fn role(&mut self, obj: ObjectId) -> BackendResult<u64> {
        Ok(self.node(obj)?.role)
    }

    fn position(&mut self, obj: ObjectId) -> BackendResult<(i32, i32)> {
        Ok(self.node(obj)?.position)
    }

    fn size(&mut self, obj: ObjectId) -> BackendResult<(u32, u32)> {
        Ok(self.node(obj)?.size)
    }

    fn text(&mut self, obj: ObjectId) -> BackendResult<Option<String>> {
        Ok(self.node(obj)?.text.clone())
    }

    fn value(&mut self, obj: ObjectId) -> BackendResult<f64> {
        Ok(self.node(obj)?.value)
    }

    fn attributes(&mut self, obj: ObjectId) -> BackendResult<BTreeMap<String, String>> {
        Ok(self.node(obj)?.attributes.clone())
    }

    fn states(&mut self, obj: ObjectId) -> BackendResult<Vec<u64>> {
        Ok(self.node(obj)?.states.clone())
    }

    fn in_state(&mut self, obj: ObjectId, state: u64) -> BackendResult<bool> {
        self.has_state(obj, state)
    }

    fn actions(&mut self, obj: ObjectId) -> BackendResult<Vec<u64>> {
        Ok(self.node(obj)?.actions.clone())
    }

    fn do_action(&mut self, obj: ObjectId, action: &ActionArg) -> BackendResult<bool> {
        self.counters.do_action_calls.fetch_add(1, Ordering::SeqCst);
        match action {
            ActionArg::Value(value) => Ok(self.node(obj)?.actions.contains(value)),
            ActionArg::Named(_) => Ok(false),
        }
    }

    fn relations(&mut self, obj: ObjectId) -> BackendResult<Vec<u64>> {
        Ok(self
            .node(obj)?
            .relations
            .iter()
            .map(|(value, _)| *value)
            .collect())
    }

    fn relation_targets(&mut self, obj: ObjectId, relation: u64) -> BackendResult<Vec<ObjectId>> {
        Ok(self
            .node(obj)?
            .relations
            .iter()
            .find(|(value, _)| *value == relation)
            .map(|(_, targets)| targets.clone())
            .unwrap_or_default())
    }

    fn set_text(&mut self, obj: ObjectId, text: &str) -> BackendResult<bool> {
        self.counters.set_text_calls.fetch_add(1, Ordering::SeqCst);
        let editable_state = self.editable_state;
        if !self.has_state(obj, editable_state)? {
            return Ok(false);
        }
        self.node_mut(obj)?.text = Some(text.to_owned());
        Ok(true)
    }

    fn set_value(&mut self, obj: ObjectId, value: f64) -> BackendResult<bool> {
        self.counters.set_value_calls.fetch_add(1, Ordering::SeqCst);
        self.node_mut(obj)?.value = value;
        Ok(true)
    }

    fn grab_focus(&mut self, obj: ObjectId) -> BackendResult<bool> {
        self.counters.grab_focus_calls.fetch_add(1, Ordering::SeqCst);
        let focusable = self
            .constants
            .states
            .lookup("FOCUSABLE")
            .unwrap_or_default();
        self.has_state(obj, focusable)
    }

    fn mouse_click(&mut self, x: i32, y: i32, button: &ButtonArg) -> BackendResult<()> {
        self.record_mouse("click", x, y, Some(button));
        Ok(())
    }

    fn mouse_double_click(&mut self, x: i32, y: i32, button: &ButtonArg) -> BackendResult<()> {
        self.record_mouse("double-click", x, y, Some(button));
        Ok(())
    }

    fn mouse_press(&mut self, x: i32, y: i32, button: &ButtonArg) -> BackendResult<()> {
        self.record_mouse("press", x, y, Some(button));
        Ok(())
    }

    fn mouse_release(&mut self, x: i32, y: i32, button: &ButtonArg) -> BackendResult<()> {
        self.record_mouse("release", x, y, Some(button));
        Ok(())
    }

    fn mouse_absolute_motion(&mut self, x: i32, y: i32) -> BackendResult<()> {
        self.record_mouse("absolute-motion", x, y, None);
        Ok(())
    }

    fn mouse_relative_motion(&mut self, x: i32, y: i32) -> BackendResult<()> {
        self.record_mouse("relative-motion", x, y, None);
        Ok(())
    }

    fn key_event(&mut self, keycode: i64, modifiers: &[i64]) -> BackendResult<()> {
        self.counters
            .key_events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((keycode, modifiers.to_vec()));
        Ok(())
    }
}
