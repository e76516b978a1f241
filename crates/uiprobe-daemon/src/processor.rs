// SPDX-License-Identifier: MIT OR Apache-2.0
//! The per-connection request dispatcher.
//!
//! A [`Processor`] lowers each incoming envelope into a typed request,
//! runs the matching operation, and builds the response extras.  It owns
//! the connection's single-entry resolution cache: the `(back-end, object,
//! path)` triple of the most recent successful GET or SEARCH.  The cache
//! is consulted only by an immediately following operation on the exact
//! same path and is cleared on every other request and on every error.

use crate::dump::{dump_accessible, ACTION_FOCUS};
use crate::search::search_accessible;
use crate::system;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uiprobe_backend::{ActionArg, BackendRegistry, ButtonArg, KeySpec, ObjectId};
use uiprobe_core::{Accessible, Fields, ObjectPath, SearchPredicates};
use uiprobe_protocol::{Envelope, ExtensionRegistry, ProtocolError, Request};

/// Mouse event names accepted by `accessibility/exec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MouseEvent {
    Click,
    DoubleClick,
    Press,
    Release,
    AbsoluteMotion,
    RelativeMotion,
}

impl MouseEvent {
    fn parse(event: &str) -> Option<Self> {
        match event {
            "CLICK" => Some(Self::Click),
            "DOUBLE_CLICK" => Some(Self::DoubleClick),
            "PRESS" => Some(Self::Press),
            "RELEASE" => Some(Self::Release),
            "ABSOLUTE_MOTION" => Some(Self::AbsoluteMotion),
            "RELATIVE_MOTION" => Some(Self::RelativeMotion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedResolution {
    backend: Option<usize>,
    object: Option<ObjectId>,
    path: ObjectPath,
}

/// One connection's request processor.
pub struct Processor {
    registry: Arc<BackendRegistry>,
    extensions: Arc<ExtensionRegistry>,
    cache: Option<CachedResolution>,
}

impl Processor {
    /// Create a processor over the process-wide registries.
    #[must_use]
    pub fn new(registry: Arc<BackendRegistry>, extensions: Arc<ExtensionRegistry>) -> Self {
        Self {
            registry,
            extensions,
            cache: None,
        }
    }

    /// Process one request and build the matching response.
    ///
    /// Component failures are absorbed into `status=false` extras; only an
    /// unsupported message surfaces as an error, for the server to answer
    /// with a structured error response.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnsupportedMessage`] for malformed or unknown
    /// requests.
    pub async fn process(&mut self, envelope: &Envelope) -> Result<Envelope, ProtocolError> {
        debug!(message = %envelope.coordinates(), "processing request");
        let request = Request::parse(envelope)?;
        let extras = match request {
            Request::AccessibilityGet {
                path,
                depth,
                include,
            } => {
                let fields = Fields::from_include(&include);
                let (status, accessible) = self.accessibility_get(&path, depth, &fields);
                accessible_extras(status, &accessible)
            }
            Request::AccessibilitySearch {
                path,
                method,
                predicates,
            } => {
                let (status, accessible) = self.accessibility_search(&path, &method, &predicates);
                accessible_extras(status, &accessible)
            }
            Request::AccessibilityPutText { path, text } => {
                status_extras(self.accessibility_put_text(&path, &text))
            }
            Request::AccessibilityPutValue { path, value } => {
                status_extras(self.accessibility_put_value(&path, value))
            }
            Request::AccessibilityExecAction { path, action } => {
                status_extras(self.accessibility_exec_action(&path, &action))
            }
            Request::AccessibilityExecKeyboard {
                path,
                keycode,
                modifiers,
            } => status_extras(self.accessibility_exec_keyboard(&path, &keycode, &modifiers)),
            Request::AccessibilityExecMouse {
                path,
                event,
                button,
                coordinates,
            } => status_extras(self.accessibility_exec_mouse(&path, &event, &button, coordinates)),
            Request::SystemGet { path } => {
                self.cache = None;
                let (status, data) = system::get_file(&path).await;
                let mut extras = status_extras(status);
                extras.insert("data".to_owned(), Value::String(data));
                extras
            }
            Request::SystemPut { path, data } => {
                self.cache = None;
                status_extras(system::put_file(&path, &data).await)
            }
            Request::SystemExec { command, wait } => {
                self.cache = None;
                let (status, stdout, stderr) = system::exec_command(&command, wait).await;
                let mut extras = status_extras(status);
                extras.insert("stdout".to_owned(), Value::String(stdout));
                extras.insert("stderr".to_owned(), Value::String(stderr));
                extras
            }
            Request::Extension { name, params } => {
                self.cache = None;
                let Some(extension) = self.extensions.get(&name) else {
                    return Err(ProtocolError::unsupported(envelope));
                };
                match extension.respond(&params) {
                    Ok((status, mut extras)) => {
                        extras.insert("status".to_owned(), Value::Bool(status));
                        extras
                    }
                    Err(err) => {
                        error!(extension = %name, error = %err, "extension request failure");
                        status_extras(false)
                    }
                }
            }
        };
        Ok(Envelope::response_to(envelope, extras))
    }

    // -- Resolution cache ------------------------------------------------

    /// Take the cached resolution if it addresses exactly `path`, otherwise
    /// resolve from scratch.  The cache is empty afterwards either way.
    fn take_resolution(&mut self, path: &ObjectPath) -> (Option<usize>, Option<ObjectId>) {
        match self.cache.take() {
            Some(cached) if cached.path == *path => (cached.backend, cached.object),
            _ => self.registry.resolve(path),
        }
    }

    // -- Accessibility operations ----------------------------------------

    fn accessibility_get(
        &mut self,
        path: &ObjectPath,
        depth: i64,
        fields: &Fields,
    ) -> (bool, Accessible) {
        self.cache = None;
        let (backend, object) = self.registry.resolve(path);
        if backend.is_none() && !path.is_empty() {
            info!(path = %path, "get accessible of requested path failure");
            return (false, Accessible::bare(path.clone()));
        }
        self.cache = Some(CachedResolution {
            backend,
            object,
            path: path.clone(),
        });
        let accessible = dump_accessible(&self.registry, backend, object, path, depth, fields);
        (true, accessible)
    }

    fn accessibility_search(
        &mut self,
        path: &ObjectPath,
        method: &str,
        predicates: &SearchPredicates,
    ) -> (bool, Accessible) {
        let (backend, object) = self.take_resolution(path);
        if backend.is_none() && !path.is_empty() {
            info!(path = %path, "accessible of requested path not found");
            return (false, Accessible::bare(path.clone()));
        }
        let outcome = search_accessible(&self.registry, backend, object, path, method, predicates);
        if let Some(hit) = outcome.hit {
            self.cache = Some(CachedResolution {
                backend: Some(hit.backend),
                object: hit.object,
                path: hit.path,
            });
        }
        (outcome.status, outcome.accessible)
    }

    fn accessibility_put_text(&mut self, path: &ObjectPath, text: &str) -> bool {
        let (backend, object) = self.take_resolution(path);
        let (Some(backend), Some(object)) = (backend, object) else {
            warn!(path = %path, "attempt of setting text on a non-accessible");
            return false;
        };
        match crate::providers::with_backend(&self.registry, backend, |a11y| {
            a11y.set_text(object, text)
        }) {
            Ok(true) => true,
            Ok(false) => {
                info!(path = %path, "set accessible text failure");
                false
            }
            Err(err) => {
                error!(path = %path, error = %err, "set accessible text error");
                false
            }
        }
    }

    fn accessibility_put_value(&mut self, path: &ObjectPath, value: f64) -> bool {
        let (backend, object) = self.take_resolution(path);
        let (Some(backend), Some(object)) = (backend, object) else {
            warn!(path = %path, "attempt of setting value on a non-accessible");
            return false;
        };
        match crate::providers::with_backend(&self.registry, backend, |a11y| {
            a11y.set_value(object, value)
        }) {
            Ok(true) => true,
            Ok(false) => {
                info!(path = %path, "set accessible value failure");
                false
            }
            Err(err) => {
                error!(path = %path, error = %err, "set accessible value error");
                false
            }
        }
    }

    fn accessibility_exec_action(&mut self, path: &ObjectPath, action: &str) -> bool {
        let (backend, object) = self.take_resolution(path);
        let (Some(backend), Some(object)) = (backend, object) else {
            warn!(path = %path, "attempt of executing an action on a non-accessible");
            return false;
        };
        let result = crate::providers::with_backend(&self.registry, backend, |a11y| {
            if action == ACTION_FOCUS {
                return a11y.grab_focus(object);
            }
            let arg = match a11y.constants().actions.lookup(action) {
                Some(value) => ActionArg::Value(value),
                None => ActionArg::Named(action.to_owned()),
            };
            a11y.do_action(object, &arg)
        });
        match result {
            Ok(true) => true,
            Ok(false) => {
                info!(path = %path, action, "execute accessible action failure");
                false
            }
            Err(err) => {
                error!(path = %path, action, error = %err, "execute accessible action error");
                false
            }
        }
    }

    fn accessibility_exec_keyboard(
        &mut self,
        path: &ObjectPath,
        keycode: &KeySpec,
        modifiers: &[i64],
    ) -> bool {
        let (backend, _object) = self.take_resolution(path);
        let Some(backend) = backend else {
            warn!(path = %path, "attempt of generating a keyboard event on a non-accessible");
            return false;
        };
        match crate::providers::with_backend(&self.registry, backend, |a11y| {
            a11y.keyboard_event(keycode, modifiers)
        }) {
            Ok(()) => true,
            Err(err) => {
                error!(path = %path, error = %err, "generate keyboard event error");
                false
            }
        }
    }

    fn accessibility_exec_mouse(
        &mut self,
        path: &ObjectPath,
        event: &str,
        button: &str,
        coordinates: (i32, i32),
    ) -> bool {
        let (backend, _object) = self.take_resolution(path);
        let Some(backend) = backend else {
            warn!(path = %path, "attempt of generating a mouse event on a non-accessible");
            return false;
        };
        let Some(event) = MouseEvent::parse(event) else {
            warn!(event, "unknown mouse event");
            return false;
        };
        let (x, y) = coordinates;
        let result = crate::providers::with_backend(&self.registry, backend, |a11y| {
            let button = match a11y.constants().buttons.lookup(button) {
                Some(value) => ButtonArg::Value(value),
                None => ButtonArg::Named(button.to_owned()),
            };
            match event {
                MouseEvent::Click => a11y.mouse_click(x, y, &button),
                MouseEvent::DoubleClick => a11y.mouse_double_click(x, y, &button),
                MouseEvent::Press => a11y.mouse_press(x, y, &button),
                MouseEvent::Release => a11y.mouse_release(x, y, &button),
                MouseEvent::AbsoluteMotion => a11y.mouse_absolute_motion(x, y),
                MouseEvent::RelativeMotion => a11y.mouse_relative_motion(x, y),
            }
        });
        match result {
            Ok(()) => true,
            Err(err) => {
                error!(path = %path, error = %err, "generate mouse event failure");
                false
            }
        }
    }
}

fn status_extras(status: bool) -> BTreeMap<String, Value> {
    let mut extras = BTreeMap::new();
    extras.insert("status".to_owned(), Value::Bool(status));
    extras
}

fn accessible_extras(status: bool, accessible: &Accessible) -> BTreeMap<String, Value> {
    let mut extras = status_extras(status);
    extras.insert(
        "accessible".to_owned(),
        serde_json::to_value(accessible).unwrap_or(Value::Null),
    );
    extras
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uiprobe_backend_mock::{MockBackend, MockCounters, MockNode, RecordedButton};
    use uiprobe_protocol::{names, MsgType, Target};

    fn fixture() -> (Processor, Arc<MockCounters>) {
        let backend = MockBackend::new(
            "at-spi",
            vec![MockNode::new("app").role("application").child(
                MockNode::new("window")
                    .role("frame")
                    .child(
                        MockNode::new("field")
                            .role("text")
                            .text("before")
                            .states(&["EDITABLE", "FOCUSABLE"]),
                    )
                    .child(MockNode::new("label").role("label").text("fixed"))
                    .child(
                        MockNode::new("go")
                            .role("push-button")
                            .actions(&["CLICK"])
                            .states(&["FOCUSABLE"]),
                    ),
            )],
        );
        let counters = backend.counters();
        let mut builder = BackendRegistry::builder();
        builder.register(Box::new(backend));
        let processor = Processor::new(
            Arc::new(builder.build()),
            Arc::new(ExtensionRegistry::new()),
        );
        (processor, counters)
    }

    fn request(target: Target, name: &str, params: Value) -> Envelope {
        let Value::Object(map) = params else {
            panic!("params must be an object");
        };
        Envelope::request(target, name, map.into_iter().collect())
    }

    #[tokio::test]
    async fn get_returns_a_serialised_subtree() {
        let (mut processor, _) = fixture();
        let response = processor
            .process(&request(
                Target::Accessibility,
                names::GET,
                json!({"path": [0, 0, 0], "depth": 1, "include": ["name", "role"]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.kind, MsgType::Response);
        assert_eq!(response.params["status"], json!(true));
        let accessible = &response.params["accessible"];
        assert_eq!(accessible["name"], json!("window"));
        assert_eq!(accessible["children"][0]["name"], json!("field"));
    }

    #[tokio::test]
    async fn get_on_a_dead_path_fails_with_a_bare_placeholder() {
        let (mut processor, _) = fixture();
        let response = processor
            .process(&request(
                Target::Accessibility,
                names::GET,
                json!({"path": [4, 0], "depth": 0, "include": ["name"]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.params["status"], json!(false));
        assert_eq!(response.params["accessible"], json!({"path": [4, 0]}));
    }

    #[tokio::test]
    async fn put_text_respects_the_backend_verdict() {
        let (mut processor, counters) = fixture();
        let ok = processor
            .process(&request(
                Target::Accessibility,
                names::PUT,
                json!({"path": [0, 0, 0, 0], "text": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(ok.params["status"], json!(true));

        let refused = processor
            .process(&request(
                Target::Accessibility,
                names::PUT,
                json!({"path": [0, 0, 0, 1], "text": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(refused.params["status"], json!(false));
        assert_eq!(counters.set_text_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn focus_action_routes_to_grab_focus() {
        let (mut processor, counters) = fixture();
        let response = processor
            .process(&request(
                Target::Accessibility,
                names::EXEC,
                json!({"path": [0, 0, 0, 2], "action": "FOCUS"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.params["status"], json!(true));
        assert_eq!(
            counters.grab_focus_calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
        assert_eq!(
            counters.do_action_calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[tokio::test]
    async fn mouse_click_reaches_the_backend_with_a_resolved_button() {
        let (mut processor, counters) = fixture();
        let response = processor
            .process(&request(
                Target::Accessibility,
                names::EXEC,
                json!({"path": [0, 0], "event": "CLICK", "button": "LEFT",
                       "coordinates": [120, 240]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.params["status"], json!(true));
        let calls = counters.mouse_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].event, "click");
        assert_eq!((calls[0].x, calls[0].y), (120, 240));
        assert!(matches!(calls[0].button, Some(RecordedButton::Value(_))));
    }

    #[tokio::test]
    async fn unknown_mouse_event_fails_without_reaching_the_backend() {
        let (mut processor, counters) = fixture();
        let response = processor
            .process(&request(
                Target::Accessibility,
                names::EXEC,
                json!({"path": [0, 0], "event": "TRIPLE_CLICK", "button": "LEFT",
                       "coordinates": [0, 0]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.params["status"], json!(false));
        assert!(counters.mouse_calls().is_empty());
    }

    #[tokio::test]
    async fn keyboard_events_resolve_symbols() {
        let (mut processor, counters) = fixture();
        let response = processor
            .process(&request(
                Target::Accessibility,
                names::EXEC,
                json!({"path": [0], "keycode": "RETURN", "modifiers": []}),
            ))
            .await
            .unwrap();
        assert_eq!(response.params["status"], json!(true));
        assert_eq!(counters.key_events().len(), 1);
    }

    #[tokio::test]
    async fn bad_key_symbol_fails_cleanly() {
        let (mut processor, counters) = fixture();
        let response = processor
            .process(&request(
                Target::Accessibility,
                names::EXEC,
                json!({"path": [0], "keycode": "NOT_A_KEY", "modifiers": []}),
            ))
            .await
            .unwrap();
        assert_eq!(response.params["status"], json!(false));
        assert!(counters.key_events().is_empty());
    }

    #[tokio::test]
    async fn malformed_put_is_an_unsupported_message() {
        let (mut processor, _) = fixture();
        let err = processor
            .process(&request(
                Target::Accessibility,
                names::PUT,
                json!({"path": [0, 0]}),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedMessage { .. }));
    }

    #[tokio::test]
    async fn unknown_extension_is_an_unsupported_message() {
        let (mut processor, _) = fixture();
        let err = processor
            .process(&request(Target::Extension, "missing", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedMessage { .. }));
    }

    #[tokio::test]
    async fn registered_extensions_answer_with_status() {
        struct Echo;
        impl uiprobe_protocol::Extension for Echo {
            fn name(&self) -> &str {
                "echo"
            }
            fn respond(
                &self,
                params: &BTreeMap<String, Value>,
            ) -> anyhow::Result<(bool, BTreeMap<String, Value>)> {
                Ok((true, params.clone()))
            }
        }
        let mut extensions = ExtensionRegistry::new();
        extensions.register(Box::new(Echo));
        let backend = MockBackend::new("at-spi", vec![MockNode::new("app")]);
        let mut builder = BackendRegistry::builder();
        builder.register(Box::new(backend));
        let mut processor = Processor::new(Arc::new(builder.build()), Arc::new(extensions));

        let response = processor
            .process(&request(Target::Extension, "echo", json!({"ping": 7})))
            .await
            .unwrap();
        assert_eq!(response.params["status"], json!(true));
        assert_eq!(response.params["ping"], json!(7));
    }

    #[tokio::test]
    async fn system_roundtrip_through_the_dispatcher() {
        let (mut processor, _) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.txt");
        let file_str = file.to_string_lossy().into_owned();

        let put = processor
            .process(&request(
                Target::System,
                names::PUT,
                json!({"path": file_str, "data": "abc"}),
            ))
            .await
            .unwrap();
        assert_eq!(put.params["status"], json!(true));

        let get = processor
            .process(&request(Target::System, names::GET, json!({"path": file_str})))
            .await
            .unwrap();
        assert_eq!(get.params["status"], json!(true));
        assert_eq!(get.params["data"], json!("abc"));

        let exec = processor
            .process(&request(
                Target::System,
                names::EXEC,
                json!({"command": "false", "wait": true}),
            ))
            .await
            .unwrap();
        assert_eq!(exec.params["status"], json!(false));
        assert_eq!(exec.params["stdout"], json!(""));
        assert_eq!(exec.params["stderr"], json!(""));
    }
}
