// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lowering of wire envelopes into typed requests.
//!
//! Several request shapes share one `target`/`name` pair (a PUT carries
//! either `text` or `value`; an EXEC carries an action, a keyboard event,
//! or a mouse event), so parsing tries the candidate shapes in a fixed
//! order and falls through to [`ProtocolError::UnsupportedMessage`].

use crate::{names, Envelope, MsgType, ProtocolError, Target};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uiprobe_backend::KeySpec;
use uiprobe_core::{ObjectPath, SearchPredicates};

/// A parsed, validated request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Dump a subtree at bounded depth.
    AccessibilityGet {
        /// Node address.
        path: ObjectPath,
        /// Dump depth; `0` is the node alone, negative is unbounded.
        depth: i64,
        /// Field names to populate.
        include: Vec<String>,
    },
    /// Structural search below a node.
    AccessibilitySearch {
        /// Starting node address.
        path: ObjectPath,
        /// Traversal method string, validated by the engine.
        method: String,
        /// Match predicates.
        predicates: SearchPredicates,
    },
    /// Replace a node's text.
    AccessibilityPutText {
        /// Node address.
        path: ObjectPath,
        /// New text.
        text: String,
    },
    /// Replace a node's value.
    AccessibilityPutValue {
        /// Node address.
        path: ObjectPath,
        /// New value.
        value: f64,
    },
    /// Perform a named action (including the synthetic `FOCUS`).
    AccessibilityExecAction {
        /// Node address.
        path: ObjectPath,
        /// Action name.
        action: String,
    },
    /// Inject a keyboard event.
    AccessibilityExecKeyboard {
        /// Back-end address; the node itself is not required.
        path: ObjectPath,
        /// Key code or symbolic name.
        keycode: KeySpec,
        /// Modifier key codes.
        modifiers: Vec<i64>,
    },
    /// Inject a mouse event.
    AccessibilityExecMouse {
        /// Back-end address.
        path: ObjectPath,
        /// Event name (`CLICK`, `PRESS`, …), validated by the dispatcher.
        event: String,
        /// Button name, resolved through the back-end's button set.
        button: String,
        /// `(x, y)` coordinates.
        coordinates: (i32, i32),
    },
    /// Read a file.
    SystemGet {
        /// Absolute file path.
        path: String,
    },
    /// Write a file.
    SystemPut {
        /// Absolute file path.
        path: String,
        /// File contents.
        data: String,
    },
    /// Run a shell command.
    SystemExec {
        /// Command line, run through the system shell.
        command: String,
        /// Whether to wait for termination and capture output.
        wait: bool,
    },
    /// An extension-defined request.
    Extension {
        /// Extension name (the envelope's `name`).
        name: String,
        /// Extension-defined parameters.
        params: BTreeMap<String, Value>,
    },
}

#[derive(Deserialize)]
struct GetParams {
    path: ObjectPath,
    depth: i64,
    #[serde(default)]
    include: Vec<String>,
}

#[derive(Deserialize)]
struct SearchParams {
    path: ObjectPath,
    method: String,
    #[serde(default)]
    predicates: SearchPredicates,
}

#[derive(Deserialize)]
struct PutTextParams {
    path: ObjectPath,
    text: String,
}

#[derive(Deserialize)]
struct PutValueParams {
    path: ObjectPath,
    value: f64,
}

#[derive(Deserialize)]
struct ExecActionParams {
    path: ObjectPath,
    action: String,
}

#[derive(Deserialize)]
struct ExecKeyboardParams {
    path: ObjectPath,
    keycode: KeySpec,
    modifiers: Vec<i64>,
}

#[derive(Deserialize)]
struct ExecMouseParams {
    path: ObjectPath,
    event: String,
    button: String,
    coordinates: (i32, i32),
}

#[derive(Deserialize)]
struct SystemGetParams {
    path: String,
}

#[derive(Deserialize)]
struct SystemPutParams {
    path: String,
    data: String,
}

fn default_wait() -> bool {
    true
}

#[derive(Deserialize)]
struct SystemExecParams {
    command: String,
    #[serde(default = "default_wait")]
    wait: bool,
}

fn params_value(envelope: &Envelope) -> Value {
    let map: Map<String, Value> = envelope
        .params
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Value::Object(map)
}

fn shape<T: for<'de> Deserialize<'de>>(envelope: &Envelope) -> Option<T> {
    serde_json::from_value(params_value(envelope)).ok()
}

impl Request {
    /// Lower an envelope into a typed request.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnsupportedMessage`] when the envelope is not a
    /// request, addresses an unknown target/name, or matches none of the
    /// shapes for its target/name pair.
    pub fn parse(envelope: &Envelope) -> Result<Self, ProtocolError> {
        if envelope.kind != MsgType::Request {
            return Err(ProtocolError::unsupported(envelope));
        }
        match (envelope.target, envelope.name.as_str()) {
            (Target::Accessibility, names::GET) => shape::<GetParams>(envelope)
                .map(|p| Self::AccessibilityGet {
                    path: p.path,
                    depth: p.depth,
                    include: p.include,
                })
                .ok_or_else(|| ProtocolError::unsupported(envelope)),
            (Target::Accessibility, names::SEARCH) => shape::<SearchParams>(envelope)
                .map(|p| Self::AccessibilitySearch {
                    path: p.path,
                    method: p.method,
                    predicates: p.predicates,
                })
                .ok_or_else(|| ProtocolError::unsupported(envelope)),
            (Target::Accessibility, names::PUT) => {
                if let Some(p) = shape::<PutTextParams>(envelope) {
                    return Ok(Self::AccessibilityPutText {
                        path: p.path,
                        text: p.text,
                    });
                }
                if let Some(p) = shape::<PutValueParams>(envelope) {
                    return Ok(Self::AccessibilityPutValue {
                        path: p.path,
                        value: p.value,
                    });
                }
                Err(ProtocolError::unsupported(envelope))
            }
            (Target::Accessibility, names::EXEC) => {
                if let Some(p) = shape::<ExecActionParams>(envelope) {
                    return Ok(Self::AccessibilityExecAction {
                        path: p.path,
                        action: p.action,
                    });
                }
                if let Some(p) = shape::<ExecKeyboardParams>(envelope) {
                    return Ok(Self::AccessibilityExecKeyboard {
                        path: p.path,
                        keycode: p.keycode,
                        modifiers: p.modifiers,
                    });
                }
                if let Some(p) = shape::<ExecMouseParams>(envelope) {
                    return Ok(Self::AccessibilityExecMouse {
                        path: p.path,
                        event: p.event,
                        button: p.button,
                        coordinates: p.coordinates,
                    });
                }
                Err(ProtocolError::unsupported(envelope))
            }
            (Target::System, names::GET) => shape::<SystemGetParams>(envelope)
                .map(|p| Self::SystemGet { path: p.path })
                .ok_or_else(|| ProtocolError::unsupported(envelope)),
            (Target::System, names::PUT) => shape::<SystemPutParams>(envelope)
                .map(|p| Self::SystemPut {
                    path: p.path,
                    data: p.data,
                })
                .ok_or_else(|| ProtocolError::unsupported(envelope)),
            (Target::System, names::EXEC) => shape::<SystemExecParams>(envelope)
                .map(|p| Self::SystemExec {
                    command: p.command,
                    wait: p.wait,
                })
                .ok_or_else(|| ProtocolError::unsupported(envelope)),
            (Target::Extension, _) => Ok(Self::Extension {
                name: envelope.name.clone(),
                params: envelope.params.clone(),
            }),
            _ => Err(ProtocolError::unsupported(envelope)),
        }
    }
}
