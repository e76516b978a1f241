// SPDX-License-Identifier: MIT OR Apache-2.0
//! Accessibility back-end abstractions.
//!
//! A back-end is a platform adapter that exposes one machine-local
//! accessibility forest through the [`Accessibility`] capability trait.
//! Installed back-ends are collected into a frozen, name-sorted
//! [`BackendRegistry`]; integer paths resolve against that registry.
//!
//! Back-ends are not assumed to be thread-safe: the registry wraps each one
//! in its own mutex and all calls go through [`BackendRegistry::lock`] or
//! [`BackendRegistry::with_backend`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod interface;
pub mod registry;

pub use constants::{
    ConstantSet, ConstantSetBuilder, ConstantSetError, ConstantTables, ACTIONS, BUTTONS, KEYS,
    RELATIONS, ROLES, STATES,
};
pub use interface::{
    Accessibility, ActionArg, BackendError, BackendResult, ButtonArg, KeySpec, ObjectId,
};
pub use registry::{BackendGuard, BackendRegistry, RegistryBuilder};
