//! Error types for ledger operations.

use thiserror::Error;

/// Failures returned by the ledger gateway.
///
/// `Clone` so that one in-flight read can hand the same outcome to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger's exclusive lock was held by another mutation. Retryable.
    #[error("ledger busy: {0}")]
    Busy(String),
    /// No member with the requested id.
    #[error("member not found: {0}")]
    NotFound(String),
    /// The card is already full. Expected, not a system failure.
    #[error("stamp cap reached")]
    CapReached,
    /// Transport failure or fatal envelope. Fatal for the current call.
    #[error("network error: {0}")]
    Network(String),
    /// The response did not have the expected shape.
    #[error("malformed ledger response: {0}")]
    Malformed(String),
    /// The ledger rejected the request for another reason.
    #[error("rejected by ledger: {0}")]
    Rejected(String),
    /// The request was invalid before it was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// A checkpoint configuration failed validation before it was sent.
    #[error("invalid checkpoint config: {0}")]
    InvalidConfig(#[from] stamplink_core::ModelError),
}

impl LedgerError {
    /// Returns true if the same request may succeed when retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Busy(_))
    }
}

impl From<stamplink_canonical::CanonicalizationError> for LedgerError {
    fn from(err: stamplink_canonical::CanonicalizationError) -> Self {
        LedgerError::InvalidRequest(err.to_string())
    }
}
