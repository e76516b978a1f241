// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire protocol between test controllers and the uiprobe daemon.
//!
//! Transport: newline-delimited JSON objects.  Every message is an
//! [`Envelope`] carrying a message type, a target, a name, and arbitrary
//! named parameters.  Incoming requests are lowered into a typed
//! [`Request`]; anything that matches no known shape is an
//! [`ProtocolError::UnsupportedMessage`], the one error the daemon answers
//! with a structured error response instead of a plain `status=false`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod extension;
pub mod request;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;
use thiserror::Error;

pub use extension::{Extension, ExtensionRegistry};
pub use request::Request;

// ---------------------------------------------------------------------------
// Message coordinates
// ---------------------------------------------------------------------------

/// Direction of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MsgType {
    /// Controller → daemon.
    Request,
    /// Daemon → controller.
    Response,
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Request => "request",
            Self::Response => "response",
        })
    }
}

/// Subsystem a message addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The accessibility forest.
    Accessibility,
    /// Local files and processes.
    System,
    /// A registered protocol extension.
    Extension,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accessibility => "accessibility",
            Self::System => "system",
            Self::Extension => "extension",
        })
    }
}

/// Well-known message names.
///
/// `Envelope::name` is an open string because an `extension`-target request
/// carries the extension's own name there.
pub mod names {
    /// Read a subtree or a file.
    pub const GET: &str = "get";
    /// Mutate text, a value, or a file.
    pub const PUT: &str = "put";
    /// Perform an action or run a command.
    pub const EXEC: &str = "exec";
    /// Structural search.
    pub const SEARCH: &str = "search";
    /// The unsolicited connection banner.
    pub const INFO: &str = "info";
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One wire message: coordinates plus named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message direction.
    #[serde(rename = "type")]
    pub kind: MsgType,
    /// Addressed subsystem.
    pub target: Target,
    /// Message name — one of [`names`], or an extension name.
    pub name: String,
    /// Remaining named parameters, flattened into the JSON object.
    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
}

impl Envelope {
    /// Build a request envelope.
    #[must_use]
    pub fn request(target: Target, name: &str, params: BTreeMap<String, Value>) -> Self {
        Self {
            kind: MsgType::Request,
            target,
            name: name.to_owned(),
            params,
        }
    }

    /// Build a response envelope.
    #[must_use]
    pub fn response(target: Target, name: &str, extras: BTreeMap<String, Value>) -> Self {
        Self {
            kind: MsgType::Response,
            target,
            name: name.to_owned(),
            params: extras,
        }
    }

    /// Build the response matching a request's coordinates.
    #[must_use]
    pub fn response_to(request: &Envelope, extras: BTreeMap<String, Value>) -> Self {
        Self::response(request.target, &request.name, extras)
    }

    /// Build the structured error response for an unsupported message.
    #[must_use]
    pub fn error_response(request: &Envelope, message: &str) -> Self {
        let mut extras = BTreeMap::new();
        extras.insert("status".to_owned(), Value::Bool(false));
        extras.insert("error".to_owned(), Value::String(message.to_owned()));
        Self::response_to(request, extras)
    }

    /// The unsolicited banner sent to every freshly accepted connection.
    #[must_use]
    pub fn info_banner(version: &str, locale: &str, extensions: &[String]) -> Self {
        let mut extras = BTreeMap::new();
        extras.insert("version".to_owned(), Value::String(version.to_owned()));
        extras.insert("locale".to_owned(), Value::String(locale.to_owned()));
        extras.insert(
            "extensions".to_owned(),
            Value::Array(
                extensions
                    .iter()
                    .map(|name| Value::String(name.clone()))
                    .collect(),
            ),
        );
        extras.insert("status".to_owned(), Value::Bool(true));
        Self::response(Target::System, names::INFO, extras)
    }

    /// A one-line description of the message coordinates for diagnostics.
    #[must_use]
    pub fn coordinates(&self) -> String {
        format!("{}/{}/{}", self.kind, self.target, self.name)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Protocol-level failures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON serialisation or deserialisation failure.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The message matched no supported request shape.
    #[error("unsupported message: {coordinates}")]
    UnsupportedMessage {
        /// `type/target/name` of the offending message.
        coordinates: String,
    },
}

impl ProtocolError {
    /// Build the unsupported-message error for an envelope.
    #[must_use]
    pub fn unsupported(envelope: &Envelope) -> Self {
        Self::UnsupportedMessage {
            coordinates: envelope.coordinates(),
        }
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Stateless codec for [`Envelope`]s as newline-delimited JSON.
#[derive(Debug, Clone, Copy)]
pub struct JsonlCodec;

impl JsonlCodec {
    /// Serialise an envelope to a newline-terminated JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Json`] if the envelope cannot be serialised.
    pub fn encode(envelope: &Envelope) -> Result<String, ProtocolError> {
        let mut line = serde_json::to_string(envelope)?;
        line.push('\n');
        Ok(line)
    }

    /// Deserialise a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Json`] if the line is not a valid envelope.
    pub fn decode(line: &str) -> Result<Envelope, ProtocolError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Lazily decode JSONL lines from a reader, skipping blank lines.
    pub fn decode_stream(
        reader: impl BufRead,
    ) -> impl Iterator<Item = Result<Envelope, ProtocolError>> {
        reader.lines().filter_map(|line| match line {
            Err(err) => Some(Err(ProtocolError::Io(err))),
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    None
                } else {
                    Some(Self::decode(line))
                }
            }
        })
    }
}
