// SPDX-License-Identifier: MIT OR Apache-2.0
//! The uiprobe request processor and TCP server.
//!
//! Responsibilities:
//! - map incoming protocol messages to strongly-typed operations
//! - traverse the accessibility forest through the back-end registry
//! - serialise bounded subtrees into wire records
//! - run structural searches with literal/regex predicates
//! - dispatch text/value mutation and keyboard/mouse injection
//! - expose local files and subprocesses to controllers
//!
//! One [`Processor`] is created per accepted connection; requests on a
//! connection are handled strictly one at a time.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod dump;
pub mod processor;
pub mod providers;
pub mod search;
pub mod server;
pub mod startup;
pub mod system;

pub use dump::{dump_accessible, ACTION_FOCUS};
pub use processor::Processor;
pub use server::serve;
pub use startup::{run_all_scripts, StartupError};
