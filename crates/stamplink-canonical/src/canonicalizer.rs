use canonical_json::to_string;
use serde_json::{Map, Value};

use std::collections::BTreeMap;
use std::fmt;

/// Error returned when a request key cannot be canonicalized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizationError {
    /// The action name was empty.
    #[error("request action must not be empty")]
    EmptyAction,
    /// A parameter name was empty.
    #[error("parameter name must not be empty (action {0})")]
    EmptyParameter(String),
    /// Canonical JSON encoding failed.
    #[error("other error: {0}")]
    Other(String),
}

/// Logical identity of a ledger request: the action plus its parameters in
/// sorted order.
///
/// Two requests that differ only in the order their parameters were supplied
/// produce the same key. The key text is the RFC 8785 canonical JSON form of
/// `{"action": ..., "params": {...}}`, so it is stable across processes and
/// can be logged or compared byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    action: String,
    canonical: String,
}

impl RequestKey {
    /// Builds a key for `action` with the given `(name, value)` parameters.
    pub fn new<I, K, V>(action: &str, params: I) -> Result<Self, CanonicalizationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if action.trim().is_empty() {
            return Err(CanonicalizationError::EmptyAction);
        }

        let mut sorted = BTreeMap::new();
        for (name, value) in params {
            let name = name.into();
            if name.is_empty() {
                return Err(CanonicalizationError::EmptyParameter(action.to_string()));
            }
            sorted.insert(name, Value::String(value.into()));
        }

        let mut root = Map::new();
        root.insert("action".to_string(), Value::String(action.to_string()));
        root.insert(
            "params".to_string(),
            Value::Object(sorted.into_iter().collect()),
        );

        let canonical = to_string(&Value::Object(root))
            .map_err(|err| CanonicalizationError::Other(err.to_string()))?;

        Ok(Self {
            action: action.to_string(),
            canonical,
        })
    }

    /// Key for an action that takes no parameters.
    pub fn action_only(action: &str) -> Result<Self, CanonicalizationError> {
        Self::new(action, std::iter::empty::<(String, String)>())
    }

    /// The action this key was built for.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Canonical JSON text of the key.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}
