// SPDX-License-Identifier: MIT OR Apache-2.0
//! Umbrella crate for the uiprobe daemon.
//!
//! Re-exports the workspace members under stable module names so that
//! integration tests and downstream embedders can depend on a single crate.
#![deny(unsafe_code)]

pub use uiprobe_backend as backend;
pub use uiprobe_backend_mock as backend_mock;
pub use uiprobe_config as config;
pub use uiprobe_core as core;
pub use uiprobe_daemon as daemon;
pub use uiprobe_protocol as protocol;
