//! Transport seam between the gateway and the remote ledger.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use stamplink_canonical::{MemberId, RequestKey};

use crate::envelope::Envelope;
use crate::error::LedgerError;

/// One request to the ledger: an action, query parameters and an optional
/// JSON body. A request with a body is a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRequest {
    /// Action name (`getUser`, `addStamp`, ...).
    pub action: String,
    /// Query parameters.
    pub params: BTreeMap<String, String>,
    /// JSON body for writes.
    pub body: Option<Value>,
    /// Whether intermediaries may serve this read from their own caches.
    pub cacheable: bool,
}

impl LedgerRequest {
    /// A read request. Reads carry a cache-buster unless marked cacheable.
    pub fn read(action: &str) -> Self {
        Self {
            action: action.to_string(),
            params: BTreeMap::new(),
            body: None,
            cacheable: false,
        }
    }

    /// A write request with a JSON body.
    pub fn write(action: &str, body: Value) -> Self {
        Self {
            action: action.to_string(),
            params: BTreeMap::new(),
            body: Some(body),
            cacheable: false,
        }
    }

    /// Adds a query parameter.
    pub fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Marks a read as safe to serve from intermediary caches.
    pub fn cacheable(mut self) -> Self {
        self.cacheable = true;
        self
    }

    /// Returns true if this request mutates the ledger.
    pub fn is_write(&self) -> bool {
        self.body.is_some()
    }

    /// Logical key used to collapse identical concurrent reads.
    pub fn key(&self) -> Result<RequestKey, LedgerError> {
        Ok(RequestKey::new(
            &self.action,
            self.params.iter().map(|(k, v)| (k.clone(), v.clone())),
        )?)
    }
}

/// Carries one request to the ledger and returns its envelope.
///
/// Implementations report transport failures as [`LedgerError::Network`] and
/// undecodable responses as [`LedgerError::Malformed`]; application-level
/// rejections come back as an envelope with `success: false`.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Performs one call.
    async fn call(&self, request: LedgerRequest) -> Result<Envelope, LedgerError>;
}

/// Receives a signal each time a mutation for a member is committed.
///
/// Used to tell other views on the same device to refresh immediately.
pub trait UpdatePublisher: Send + Sync {
    /// Called after a committed mutation.
    fn ledger_updated(&self, member_id: &MemberId);
}
