//! Typed access to the ledger's JSON response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stamplink_core::{CheckpointConfig, Member, StampEvent};

use crate::error::LedgerError;

/// Response envelope: `{success, error, fatal, code, user, users, history, config}`.
///
/// Every field is optional on the wire. `getAll` answers with only `users`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the action succeeded.
    #[serde(default)]
    pub success: bool,
    /// Human readable error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the failure happened below the application (transport, deployment).
    #[serde(default)]
    pub fatal: bool,
    /// Optional stable rejection code (`BUSY`, `NOT_FOUND`, `CAP_REACHED`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Member payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    /// Member list payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Value>,
    /// History payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Value>,
    /// Checkpoint configuration payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

/// How an unclassified `success: false` should be read for a given action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Lookup actions: an unexplained failure means the member is missing.
    NotFound,
    /// `addStamp`: an unexplained failure means the card is full.
    CapReached,
    /// Anything else.
    Rejected,
}

impl Envelope {
    /// Successful envelope carrying a member.
    pub fn with_user(member: &Member) -> Result<Self, LedgerError> {
        Ok(Self {
            success: true,
            user: Some(to_value(member)?),
            ..Self::default()
        })
    }

    /// Failed envelope with a message and optional code.
    pub fn failure(error: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            code: code.map(str::to_string),
            ..Self::default()
        }
    }

    /// Converts a failed envelope into the matching [`LedgerError`].
    ///
    /// `fatal` always maps to `Network`. Otherwise the explicit `code` wins,
    /// then keywords in the message, then the per-action `fallback`.
    pub fn check(self, fallback: Rejection) -> Result<Self, LedgerError> {
        let message = self
            .error
            .clone()
            .unwrap_or_else(|| "request failed".to_string());

        if self.fatal {
            return Err(LedgerError::Network(message));
        }
        if self.success {
            return Ok(self);
        }

        if let Some(code) = self.code.as_deref() {
            match code.to_ascii_uppercase().as_str() {
                "BUSY" | "LOCKED" => return Err(LedgerError::Busy(message)),
                "NOT_FOUND" => return Err(LedgerError::NotFound(message)),
                "CAP_REACHED" | "MAX_STAMPS" => return Err(LedgerError::CapReached),
                _ => {}
            }
        }

        let tokens = words(&message);
        let says = |phrase: &str| mentions(&tokens, phrase);
        if says("busy") || says("locked") || says("lock timeout") {
            return Err(LedgerError::Busy(message));
        }
        if says("not found") {
            return Err(LedgerError::NotFound(message));
        }
        if ["maximum stamps", "max stamps", "capacity reached", "card is full", "card full"]
            .iter()
            .any(|&phrase| says(phrase))
        {
            return Err(LedgerError::CapReached);
        }

        Err(match fallback {
            Rejection::NotFound => LedgerError::NotFound(message),
            Rejection::CapReached => LedgerError::CapReached,
            Rejection::Rejected => LedgerError::Rejected(message),
        })
    }

    /// Decodes the `user` payload.
    pub fn member(&self) -> Result<Member, LedgerError> {
        decode(self.user.as_ref(), "user")
    }

    /// Decodes the `users` payload. A missing list is an empty ledger.
    pub fn members(&self) -> Result<Vec<Member>, LedgerError> {
        match self.users {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(ref users) => decode(Some(users), "users"),
        }
    }

    /// Decodes the `history` payload.
    pub fn history(&self) -> Result<Vec<StampEvent>, LedgerError> {
        decode(self.history.as_ref(), "history")
    }

    /// Decodes the `config` payload.
    pub fn checkpoint_config(&self) -> Result<CheckpointConfig, LedgerError> {
        decode(self.config.as_ref(), "config")
    }
}

pub(crate) fn to_value<T: Serialize>(value: &T) -> Result<Value, LedgerError> {
    serde_json::to_value(value).map_err(|e| LedgerError::Malformed(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(
    value: Option<&Value>,
    field: &str,
) -> Result<T, LedgerError> {
    let value = value.ok_or_else(|| LedgerError::Malformed(format!("missing `{field}`")))?;
    serde_json::from_value(value.clone())
        .map_err(|e| LedgerError::Malformed(format!("`{field}`: {e}")))
}

/// Lowercased alphanumeric words of a message.
fn words(message: &str) -> Vec<String> {
    message
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Returns true if `phrase` occurs as a run of whole words.
fn mentions(words: &[String], phrase: &str) -> bool {
    let wanted: Vec<&str> = phrase.split(' ').collect();
    words
        .windows(wanted.len())
        .any(|window| window.iter().zip(&wanted).all(|(word, want)| word == want))
}
