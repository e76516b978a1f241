// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subtree serialisation into wire records.

use crate::providers::{with_backend, Children};
use std::collections::VecDeque;
use tracing::error;
use uiprobe_backend::{Accessibility, BackendError, BackendRegistry, BackendResult, ObjectId};
use uiprobe_core::{Accessible, Fields, ObjectPath, Relation};

/// The synthetic action offered by every focusable node.
///
/// It never reaches a back-end's action table: executing it routes to
/// `grab_focus` instead.
pub const ACTION_FOCUS: &str = "FOCUS";

/// Serialise `(backend, object)` at `path` into an [`Accessible`] record.
///
/// `depth` bounds recursion over children: `0` dumps the node alone and a
/// negative depth is unbounded.  Only the requested `fields` are
/// populated.  A back-end failure degrades the offending node to a bare
/// record; it never propagates out of the serialiser.
pub fn dump_accessible(
    registry: &BackendRegistry,
    backend: Option<usize>,
    object: Option<ObjectId>,
    path: &ObjectPath,
    depth: i64,
    fields: &Fields,
) -> Accessible {
    if object.is_none() && path.len() >= 2 {
        // A broken reference: the address survives, the node does not.
        return Accessible::bare(path.clone());
    }
    match dump_node(registry, backend, object, path, depth, fields) {
        Ok(accessible) => accessible,
        Err(err) => {
            error!(path = %path, error = %err, "dumping accessible object failed");
            Accessible::bare(path.clone())
        }
    }
}

fn dump_node(
    registry: &BackendRegistry,
    backend: Option<usize>,
    object: Option<ObjectId>,
    path: &ObjectPath,
    depth: i64,
    fields: &Fields,
) -> BackendResult<Accessible> {
    let mut children = Vec::new();
    if depth != 0 {
        for candidate in Children::new(registry, backend, object, path)? {
            let candidate = candidate?;
            children.push(dump_accessible(
                registry,
                Some(candidate.backend),
                candidate.object,
                &candidate.path,
                depth - 1,
                fields,
            ));
        }
    }
    let mut accessible = Accessible::with_children(path.clone(), children);
    match (backend, object) {
        (None, _) => {
            // The registry root only has a child count.
            if fields.count {
                accessible.count = Some(registry.len() as u32);
            }
        }
        (Some(index), None) => {
            // A back-end virtual root has a name and a child count.
            if fields.name {
                accessible.name = registry.name(index).map(str::to_owned);
            }
            if fields.count {
                let count = with_backend(registry, index, |a11y| a11y.count_children(None))?;
                accessible.count = Some(count as u32);
            }
        }
        (Some(index), Some(obj)) => {
            let mut guard = registry
                .lock(index)
                .ok_or_else(|| BackendError::Failure(format!("no back-end at index {index}")))?;
            populate_fields(&mut *guard, obj, path, fields, &mut accessible)?;
        }
    }
    Ok(accessible)
}

fn populate_fields(
    a11y: &mut dyn Accessibility,
    obj: ObjectId,
    path: &ObjectPath,
    fields: &Fields,
    accessible: &mut Accessible,
) -> BackendResult<()> {
    if fields.name {
        accessible.name = Some(a11y.object_name(obj)?);
    }
    if fields.description {
        accessible.description = Some(a11y.description(obj)?);
    }
    if fields.role {
        accessible.role = Some(a11y.role_name(obj)?);
    }
    if fields.count {
        accessible.count = Some(a11y.count_children(Some(obj))? as u32);
    }
    if fields.position {
        accessible.position = Some(a11y.position(obj)?);
    }
    if fields.size {
        accessible.size = Some(a11y.size(obj)?);
    }
    if fields.text {
        accessible.text = a11y.text(obj)?;
        let editable_state = a11y.constants().states.lookup("EDITABLE");
        accessible.editable = Some(match editable_state {
            Some(state) => a11y.in_state(obj, state)?,
            None => false,
        });
    }
    if fields.value {
        accessible.value = Some(a11y.value(obj)?);
    }
    if fields.actions {
        let mut actions = a11y.action_names(obj)?;
        let focusable_state = a11y.constants().states.lookup("FOCUSABLE");
        if let Some(state) = focusable_state
            && a11y.in_state(obj, state)?
        {
            actions.insert(0, ACTION_FOCUS.to_owned());
        }
        accessible.actions = Some(actions);
    }
    if fields.states {
        let values = a11y.states(obj)?;
        let named = values
            .iter()
            .filter_map(|&value| a11y.constants().states.reverse(value))
            .map(str::to_owned)
            .collect();
        accessible.states = Some(named);
    }
    if fields.attributes {
        accessible.attributes = Some(a11y.attributes(obj)?);
    }
    if fields.relations {
        let mut relations = Vec::new();
        for relation in a11y.relations(obj)? {
            let Some(name) = a11y.constants().relations.reverse(relation) else {
                continue;
            };
            let mut target_paths = Vec::new();
            for target in a11y.relation_targets(obj, relation)? {
                target_paths.push(relation_target_path(a11y, target, path)?);
            }
            relations.push(Relation::new(name, target_paths));
        }
        accessible.relations = Some(relations);
    }
    Ok(())
}

/// Address a relation target by walking its parent chain, then grafting the
/// indices under the requesting path's back-end and application components.
fn relation_target_path(
    a11y: &mut dyn Accessibility,
    target: ObjectId,
    request_path: &ObjectPath,
) -> BackendResult<ObjectPath> {
    let components = request_path.components();
    if components.len() < 2 {
        return Err(BackendError::Failure(
            "relation target outside an application subtree".into(),
        ));
    }
    let mut indices = VecDeque::new();
    let mut cursor = Some(target);
    while let Some(obj) = cursor {
        let parent = a11y.parent(obj)?;
        // The application root's slot is already covered by the request
        // path's second component, so only nodes below it contribute.
        if parent.is_some() {
            indices.push_front(a11y.index_in_parent(obj)? as u32);
        }
        cursor = parent;
    }
    let mut out = Vec::with_capacity(indices.len() + 2);
    out.push(components[0]);
    out.push(components[1]);
    out.extend(indices);
    Ok(ObjectPath::new(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uiprobe_backend_mock::{MockBackend, MockNode};

    fn registry() -> Arc<BackendRegistry> {
        let mut builder = BackendRegistry::builder();
        builder.register(Box::new(MockBackend::new(
            "at-spi",
            vec![MockNode::new("editor").role("application").child(
                MockNode::new("window")
                    .role("frame")
                    .position(10, 20)
                    .size(640, 480)
                    .child(MockNode::new("title").role("label").description("window title"))
                    .child(
                        MockNode::new("input")
                            .role("text")
                            .text("draft")
                            .states(&["EDITABLE", "FOCUSABLE", "VISIBLE"])
                            .raw_state(9999)
                            .relation("LABELLED_BY", &["title"]),
                    )
                    .child(
                        MockNode::new("save")
                            .role("push-button")
                            .actions(&["CLICK", "PRESS"])
                            .attribute("toolkit", "mock"),
                    ),
            )],
        )));
        builder.register(Box::new(MockBackend::new(
            "win32",
            vec![MockNode::new("empty-app")],
        )));
        Arc::new(builder.build())
    }

    fn dump_path(registry: &BackendRegistry, path: &[u32], depth: i64, fields: &Fields) -> Accessible {
        let path = ObjectPath::new(path.to_vec());
        let (backend, object) = registry.resolve(&path);
        dump_accessible(registry, backend, object, &path, depth, fields)
    }

    #[test]
    fn node_path_round_trips() {
        let registry = registry();
        let acc = dump_path(&registry, &[0, 0, 0], 0, &Fields::all());
        assert_eq!(acc.path, ObjectPath::new(vec![0, 0, 0]));
        assert!(acc.children.is_empty());
    }

    #[test]
    fn registry_root_dump_only_counts() {
        let registry = registry();
        let acc = dump_path(&registry, &[], 0, &Fields::all());
        assert_eq!(acc.count, Some(2));
        assert_eq!(acc.name, None);
        assert_eq!(acc.role, None);
    }

    #[test]
    fn backend_root_dump_has_name_and_count() {
        let registry = registry();
        let acc = dump_path(&registry, &[1], 0, &Fields::all());
        assert_eq!(acc.name.as_deref(), Some("win32"));
        assert_eq!(acc.count, Some(1));
        assert_eq!(acc.role, None);
        assert_eq!(acc.states, None);
    }

    #[test]
    fn children_paths_extend_the_parent_by_their_index() {
        let registry = registry();
        let acc = dump_path(&registry, &[0, 0, 0], 1, &Fields::from_include(&["name"]));
        assert_eq!(acc.children.len(), 3);
        for (index, child) in acc.children.iter().enumerate() {
            assert_eq!(child.path, acc.path.child(index as u32));
            assert!(child.children.is_empty());
        }
    }

    #[test]
    fn depth_zero_never_recurses() {
        let registry = registry();
        let acc = dump_path(&registry, &[0, 0, 0], 0, &Fields::all());
        assert!(acc.children.is_empty());
        assert_eq!(acc.count, Some(3));
    }

    #[test]
    fn negative_depth_dumps_the_whole_subtree() {
        let registry = registry();
        let acc = dump_path(&registry, &[0, 0], -1, &Fields::from_include(&["name"]));
        assert_eq!(acc.children.len(), 1);
        assert_eq!(acc.children[0].children.len(), 3);
    }

    #[test]
    fn only_requested_fields_are_populated() {
        let registry = registry();
        let acc = dump_path(&registry, &[0, 0, 0], 0, &Fields::from_include(&["name", "size"]));
        assert_eq!(acc.name.as_deref(), Some("window"));
        assert_eq!(acc.size, Some((640, 480)));
        assert_eq!(acc.position, None);
        assert_eq!(acc.role, None);
        assert_eq!(acc.count, None);
    }

    #[test]
    fn text_dump_sets_editable_from_state() {
        let registry = registry();
        let input = dump_path(&registry, &[0, 0, 0, 1], 0, &Fields::all());
        assert_eq!(input.text.as_deref(), Some("draft"));
        assert_eq!(input.editable, Some(true));

        let title = dump_path(&registry, &[0, 0, 0, 0], 0, &Fields::all());
        assert_eq!(title.text, None);
        assert_eq!(title.editable, Some(false));
    }

    #[test]
    fn focusable_nodes_lead_their_actions_with_focus() {
        let registry = registry();
        let input = dump_path(&registry, &[0, 0, 0, 1], 0, &Fields::all());
        assert_eq!(input.actions.as_deref(), Some(&["FOCUS".to_owned()][..]));

        let save = dump_path(&registry, &[0, 0, 0, 2], 0, &Fields::all());
        assert_eq!(
            save.actions,
            Some(vec!["CLICK".to_owned(), "PRESS".to_owned()])
        );
    }

    #[test]
    fn states_without_a_symbolic_name_are_dropped() {
        let registry = registry();
        let input = dump_path(&registry, &[0, 0, 0, 1], 0, &Fields::all());
        let states = input.states.unwrap();
        assert!(states.contains(&"EDITABLE".to_owned()));
        assert!(states.contains(&"FOCUSABLE".to_owned()));
        assert_eq!(states.len(), 3);
    }

    #[test]
    fn relations_point_at_absolute_paths() {
        let registry = registry();
        let input = dump_path(&registry, &[0, 0, 0, 1], 0, &Fields::all());
        let relations = input.relations.unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].name, "LABELLED_BY");
        assert_eq!(relations[0].targets, vec![ObjectPath::new(vec![0, 0, 0, 0])]);
    }

    #[test]
    fn broken_references_dump_bare() {
        let registry = registry();
        let path = ObjectPath::new(vec![0, 0, 9]);
        let acc = dump_accessible(&registry, Some(0), None, &path, 0, &Fields::all());
        assert_eq!(acc, Accessible::bare(path));
    }

    #[test]
    fn backend_failure_degrades_the_offending_node_only() {
        let mut builder = BackendRegistry::builder();
        builder.register(Box::new(MockBackend::new(
            "flaky",
            vec![MockNode::new("app")
                .child(MockNode::new("fine"))
                .child(MockNode::new("broken").failing_child_count())],
        )));
        let registry = builder.build();
        let acc = dump_path(&registry, &[0, 0], 1, &Fields::from_include(&["name", "count"]));
        assert_eq!(acc.children.len(), 2);
        assert_eq!(acc.children[0].name.as_deref(), Some("fine"));
        // The broken child degraded to a bare record with only its path.
        assert_eq!(acc.children[1].name, None);
        assert_eq!(acc.children[1].path, ObjectPath::new(vec![0, 0, 1]));
    }
}
