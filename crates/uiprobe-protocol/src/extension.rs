// SPDX-License-Identifier: MIT OR Apache-2.0
//! Protocol extensions.
//!
//! An extension claims a message name under the `extension` target and
//! answers requests with a success flag plus arbitrary response extras.
//! Unknown extension names surface as unsupported messages.

use serde_json::Value;
use std::collections::BTreeMap;

/// A named protocol extension.
pub trait Extension: Send + Sync {
    /// The name this extension is addressed by.
    fn name(&self) -> &str;

    /// Answer one request.
    ///
    /// Returns the response status and the extras to merge into the
    /// response envelope.  Any error is converted by the dispatcher into a
    /// plain `status=false` response.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn respond(
        &self,
        params: &BTreeMap<String, Value>,
    ) -> anyhow::Result<(bool, BTreeMap<String, Value>)>;
}

/// Registry of installed extensions, keyed by name.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: BTreeMap<String, Box<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Start an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension, replacing any previous one of the same name.
    pub fn register(&mut self, extension: Box<dyn Extension>) {
        self.extensions
            .insert(extension.name().to_owned(), extension);
    }

    /// Look up an extension by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Extension> {
        self.extensions.get(name).map(|ext| ext.as_ref())
    }

    /// Sorted names of every registered extension.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.extensions.keys().cloned().collect()
    }

    /// Number of registered extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    impl Extension for Echo {
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

    #[test]
    fn register_and_respond() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Box::new(Echo));
        assert_eq!(registry.names(), vec!["echo".to_owned()]);

        let mut params = BTreeMap::new();
        params.insert("ping".to_owned(), json!(1));
        let (status, extras) = registry.get("echo").unwrap().respond(&params).unwrap();
        assert!(status);
        assert_eq!(extras["ping"], json!(1));
    }

    #[test]
    fn unknown_names_are_absent() {
        let registry = ExtensionRegistry::new();
        assert!(registry.get("missing").is_none());
        assert!(registry.is_empty());
    }
}
