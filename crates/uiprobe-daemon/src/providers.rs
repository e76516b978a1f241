// SPDX-License-Identifier: MIT OR Apache-2.0
//! Traversal providers over the accessibility forest.
//!
//! All three providers yield [`Candidate`]s — `(back-end, object, path)`
//! triples.  When the traversal origin is the registry root, the first
//! level iterates over the installed back-ends themselves (object absent);
//! otherwise it iterates over accessible children.  Back-end failures are
//! yielded as errors so that callers decide whether to degrade (the
//! serialiser) or abort (the search engine).

use std::collections::VecDeque;

use uiprobe_backend::{Accessibility, BackendError, BackendRegistry, BackendResult, ObjectId};
use uiprobe_core::ObjectPath;

/// One traversal step: the node at `path`, owned by back-end `backend`.
///
/// `object` is absent for a back-end virtual root and for a child slot the
/// back-end could not materialise (a broken reference).
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Index of the owning back-end.
    pub backend: usize,
    /// The resolved object, when one exists.
    pub object: Option<ObjectId>,
    /// Address of this candidate.
    pub path: ObjectPath,
}

/// Traversal origin: the registry root, or one node of one back-end.
#[derive(Debug, Clone, Copy)]
enum Origin {
    Registry,
    Node {
        backend: usize,
        object: Option<ObjectId>,
    },
}

impl Origin {
    fn new(backend: Option<usize>, object: Option<ObjectId>) -> Self {
        match backend {
            None => Self::Registry,
            Some(backend) => Self::Node { backend, object },
        }
    }
}

/// Run one back-end call, treating a vanished back-end as a failure.
pub(crate) fn with_backend<R>(
    registry: &BackendRegistry,
    index: usize,
    f: impl FnOnce(&mut dyn Accessibility) -> BackendResult<R>,
) -> BackendResult<R> {
    registry
        .with_backend(index, f)
        .unwrap_or_else(|| Err(BackendError::Failure(format!("no back-end at index {index}"))))
}

fn origin_child_count(
    registry: &BackendRegistry,
    backend: Option<usize>,
    object: Option<ObjectId>,
) -> BackendResult<usize> {
    match backend {
        None => Ok(registry.len()),
        Some(index) => with_backend(registry, index, |a11y| a11y.count_children(object)),
    }
}

// ---------------------------------------------------------------------------
// Forward children
// ---------------------------------------------------------------------------

/// Direct children in index order `0, 1, …, count-1`.
pub struct Children<'r> {
    registry: &'r BackendRegistry,
    origin: Origin,
    path: ObjectPath,
    index: usize,
    count: usize,
}

impl<'r> Children<'r> {
    /// Start a forward traversal below `(backend, object)` at `path`.
    ///
    /// # Errors
    ///
    /// Any back-end failure while counting children.
    pub fn new(
        registry: &'r BackendRegistry,
        backend: Option<usize>,
        object: Option<ObjectId>,
        path: &ObjectPath,
    ) -> BackendResult<Self> {
        Ok(Self {
            registry,
            origin: Origin::new(backend, object),
            path: path.clone(),
            index: 0,
            count: origin_child_count(registry, backend, object)?,
        })
    }
}

impl Iterator for Children<'_> {
    type Item = BackendResult<Candidate>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let index = self.index;
        self.index += 1;
        Some(candidate_at(self.registry, self.origin, &self.path, index))
    }
}

// ---------------------------------------------------------------------------
// Backward children
// ---------------------------------------------------------------------------

/// Direct children in reverse index order `count-1, …, 0`.
pub struct ChildrenBackwards<'r> {
    registry: &'r BackendRegistry,
    origin: Origin,
    path: ObjectPath,
    index: i64,
}

impl<'r> ChildrenBackwards<'r> {
    /// Start a backward traversal below `(backend, object)` at `path`.
    ///
    /// # Errors
    ///
    /// Any back-end failure while counting children.
    pub fn new(
        registry: &'r BackendRegistry,
        backend: Option<usize>,
        object: Option<ObjectId>,
        path: &ObjectPath,
    ) -> BackendResult<Self> {
        Ok(Self {
            registry,
            origin: Origin::new(backend, object),
            path: path.clone(),
            index: origin_child_count(registry, backend, object)? as i64,
        })
    }
}

impl Iterator for ChildrenBackwards<'_> {
    type Item = BackendResult<Candidate>;

    fn next(&mut self) -> Option<Self::Item> {
        self.index -= 1;
        if self.index < 0 {
            return None;
        }
        Some(candidate_at(
            self.registry,
            self.origin,
            &self.path,
            self.index as usize,
        ))
    }
}

// ---------------------------------------------------------------------------
// Breadth-first descendants
// ---------------------------------------------------------------------------

/// All descendants, level by level.
///
/// A FIFO of pending parents keeps the walk iterative; a node with zero
/// children contributes nothing to the queue.  The accessible graph is a
/// tree by contract, so no cycle detection is performed.
pub struct Descendants<'r> {
    registry: &'r BackendRegistry,
    origin: Origin,
    path: ObjectPath,
    index: usize,
    count: usize,
    queue: VecDeque<(usize, Option<ObjectId>, ObjectPath)>,
}

impl<'r> Descendants<'r> {
    /// Start a breadth-first traversal below `(backend, object)` at `path`.
    ///
    /// # Errors
    ///
    /// Any back-end failure while counting children.
    pub fn new(
        registry: &'r BackendRegistry,
        backend: Option<usize>,
        object: Option<ObjectId>,
        path: &ObjectPath,
    ) -> BackendResult<Self> {
        Ok(Self {
            registry,
            origin: Origin::new(backend, object),
            path: path.clone(),
            index: 0,
            count: origin_child_count(registry, backend, object)?,
            queue: VecDeque::new(),
        })
    }

    fn enqueue_if_parent(
        &mut self,
        backend: usize,
        object: Option<ObjectId>,
        path: &ObjectPath,
    ) -> BackendResult<()> {
        // Broken child slots count as leaves.
        let count = match object {
            Some(obj) => with_backend(self.registry, backend, |a11y| {
                a11y.count_children(Some(obj))
            })?,
            None => 0,
        };
        if count > 0 {
            self.queue.push_back((backend, object, path.clone()));
        }
        Ok(())
    }

    fn next_step(&mut self) -> BackendResult<Option<Candidate>> {
        if let Origin::Registry = self.origin
            && self.index < self.count
        {
            let backend = self.index;
            self.index += 1;
            let path = self.path.child(backend as u32);
            let count = with_backend(self.registry, backend, |a11y| a11y.count_children(None))?;
            if count > 0 {
                self.queue.push_back((backend, None, path.clone()));
            }
            return Ok(Some(Candidate {
                backend,
                object: None,
                path,
            }));
        }

        while self.index >= self.count {
            let Some((backend, object, path)) = self.queue.pop_front() else {
                return Ok(None);
            };
            self.origin = Origin::Node { backend, object };
            self.path = path;
            self.index = 0;
            self.count = with_backend(self.registry, backend, |a11y| {
                a11y.count_children(object)
            })?;
        }

        let Origin::Node { backend, object } = self.origin else {
            return Ok(None);
        };
        let index = self.index;
        self.index += 1;
        let child = with_backend(self.registry, backend, |a11y| a11y.child_at(object, index))?;
        let child_path = self.path.child(index as u32);
        self.enqueue_if_parent(backend, child, &child_path)?;
        Ok(Some(Candidate {
            backend,
            object: child,
            path: child_path,
        }))
    }
}

impl Iterator for Descendants<'_> {
    type Item = BackendResult<Candidate>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_step().transpose()
    }
}

// ---------------------------------------------------------------------------

fn candidate_at(
    registry: &BackendRegistry,
    origin: Origin,
    path: &ObjectPath,
    index: usize,
) -> BackendResult<Candidate> {
    let child_path = path.child(index as u32);
    match origin {
        Origin::Registry => Ok(Candidate {
            backend: index,
            object: None,
            path: child_path,
        }),
        Origin::Node { backend, object } => {
            let child = with_backend(registry, backend, |a11y| a11y.child_at(object, index))?;
            Ok(Candidate {
                backend,
                object: child,
                path: child_path,
            })
        }
    }
}
