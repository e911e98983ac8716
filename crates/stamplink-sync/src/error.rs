//! Failure taxonomy shared by the admin and member flows.

use stamplink_ledger::LedgerError;
use stamplink_peer::PeerError;
use thiserror::Error;

/// Classified failure of a sync operation.
///
/// Resolution failures keep "not found", "device unreachable" and
/// "malformed code" apart so each can be presented with its own recovery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No member with the requested id.
    #[error("member not found: {0}")]
    NotFound(String),
    /// Ledger lock contention. Retryable.
    #[error("ledger busy: {0}")]
    Busy(String),
    /// The card is already full. Expected, not a system failure.
    #[error("stamp cap reached")]
    CapReached,
    /// The member's device could not be reached in time.
    #[error("member device unreachable: {0}")]
    PeerUnreachable(String),
    /// Ledger transport failure. Fatal for the current operation.
    #[error("network error: {0}")]
    Network(String),
    /// A scanned code, ledger response or peer message had an unexpected shape.
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// The ledger refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
    /// A configuration file or value is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Returns true if retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Busy(_) | SyncError::PeerUnreachable(_))
    }
}

impl From<LedgerError> for SyncError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Busy(msg) => SyncError::Busy(msg),
            LedgerError::NotFound(msg) => SyncError::NotFound(msg),
            LedgerError::CapReached => SyncError::CapReached,
            LedgerError::Network(msg) => SyncError::Network(msg),
            LedgerError::Malformed(msg) => SyncError::Malformed(msg),
            LedgerError::Rejected(msg) | LedgerError::InvalidRequest(msg) => {
                SyncError::Rejected(msg)
            }
            LedgerError::InvalidConfig(e) => SyncError::InvalidConfig(e.to_string()),
        }
    }
}

impl From<PeerError> for SyncError {
    fn from(err: PeerError) -> Self {
        match err {
            PeerError::Unreachable(_)
            | PeerError::Timeout(_)
            | PeerError::Io(_)
            | PeerError::Closed => SyncError::PeerUnreachable(err.to_string()),
            PeerError::Frame(_)
            | PeerError::PayloadTooLarge { .. }
            | PeerError::Codec(_)
            | PeerError::UnexpectedReply(_)
            | PeerError::InvalidSession(_) => SyncError::Malformed(err.to_string()),
        }
    }
}
