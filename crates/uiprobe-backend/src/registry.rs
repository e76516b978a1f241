// SPDX-License-Identifier: MIT OR Apache-2.0
//! The frozen, name-sorted sequence of installed back-ends.
//!
//! Back-ends register explicitly at program start through a
//! [`RegistryBuilder`]; the built registry is immutable for the rest of the
//! process lifetime.  The sort order is load-bearing: the first component
//! of every wire path is an index into this sequence.

use crate::interface::{Accessibility, ObjectId};
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;
use uiprobe_core::ObjectPath;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects back-ends before the registry freezes.
#[derive(Default)]
pub struct RegistryBuilder {
    backends: Vec<(String, Box<dyn Accessibility>)>,
}

impl RegistryBuilder {
    /// Start an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one back-end.
    ///
    /// A back-end with an empty name, or whose name was already registered,
    /// is dropped with a warning — loading a bad adapter must never abort
    /// the daemon.
    pub fn register(&mut self, backend: Box<dyn Accessibility>) -> &mut Self {
        let name = backend.name().to_owned();
        if name.is_empty() {
            warn!("dropping back-end with an empty name");
            return self;
        }
        if self.backends.iter().any(|(existing, _)| *existing == name) {
            warn!(backend = %name, "dropping duplicate back-end, keeping the first");
            return self;
        }
        self.backends.push((name, backend));
        self
    }

    /// Freeze the registry, sorting back-ends by name.
    #[must_use]
    pub fn build(self) -> BackendRegistry {
        let mut backends = self.backends;
        backends.sort_by(|(a, _), (b, _)| a.cmp(b));
        BackendRegistry {
            backends: backends
                .into_iter()
                .map(|(name, backend)| BackendCell {
                    name,
                    inner: Mutex::new(backend),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct BackendCell {
    name: String,
    inner: Mutex<Box<dyn Accessibility>>,
}

/// Immutable, lexicographically sorted sequence of installed back-ends.
pub struct BackendRegistry {
    backends: Vec<BackendCell>,
}

/// Exclusive access to one back-end for the duration of an operation.
pub struct BackendGuard<'a> {
    guard: MutexGuard<'a, Box<dyn Accessibility>>,
}

impl Deref for BackendGuard<'_> {
    type Target = dyn Accessibility;

    fn deref(&self) -> &Self::Target {
        self.guard.as_ref()
    }
}

impl DerefMut for BackendGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.as_mut()
    }
}

impl BackendRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Number of installed back-ends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// `true` when no back-end is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Name of the back-end at `index`.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.backends.get(index).map(|cell| cell.name.as_str())
    }

    /// All back-end names in registry order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|cell| cell.name.as_str()).collect()
    }

    /// Lock the back-end at `index` for a sequence of calls.
    ///
    /// A poisoned mutex is recovered rather than propagated: a panic inside
    /// an adapter must not take every later request down with it.
    #[must_use]
    pub fn lock(&self, index: usize) -> Option<BackendGuard<'_>> {
        let cell = self.backends.get(index)?;
        let guard = cell
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Some(BackendGuard { guard })
    }

    /// Run `f` with exclusive access to the back-end at `index`.
    pub fn with_backend<R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut dyn Accessibility) -> R,
    ) -> Option<R> {
        let mut guard = self.lock(index)?;
        Some(f(&mut *guard))
    }

    /// Resolve a path into a `(back-end index, object)` pair.
    ///
    /// The empty path and any path whose back-end index is out of range
    /// resolve to `(None, None)`.  A path of length one resolves to the
    /// back-end's virtual root, `(Some(index), None)`.  Longer paths walk
    /// child indices; any absent step or back-end failure resolves the
    /// whole path to `(None, None)`.
    #[must_use]
    pub fn resolve(&self, path: &ObjectPath) -> (Option<usize>, Option<ObjectId>) {
        let components = path.components();
        let Some(&backend_index) = components.first() else {
            return (None, None);
        };
        let backend_index = backend_index as usize;
        if backend_index >= self.backends.len() {
            return (None, None);
        }
        let mut object = None;
        for &index in &components[1..] {
            let step = self.with_backend(backend_index, |a11y| {
                a11y.child(object, i64::from(index))
            });
            match step {
                Some(Ok(Some(child))) => object = Some(child),
                _ => return (None, None),
            }
        }
        (Some(backend_index), object)
    }
}
