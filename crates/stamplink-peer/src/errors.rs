use std::time::Duration;

use thiserror::Error;

/// Errors that can occur on the peer channel.
#[derive(Error, Debug)]
pub enum PeerError {
    /// No host is listening under the session id, or the connection was refused.
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    /// The exchange did not complete within the bound.
    #[error("peer did not answer within {0:?}")]
    Timeout(Duration),
    /// I/O error on the connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid preamble or frame header.
    #[error("invalid frame: {0}")]
    Frame(String),
    /// Payload exceeds the frame size limit.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size.
        size: usize,
        /// Maximum allowed size.
        max: u32,
    },
    /// Frame payload is not a valid peer message.
    #[error("message codec error: {0}")]
    Codec(#[from] serde_json::Error),
    /// The host answered with a message that does not match the request.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
    /// The connection closed mid-frame or before a reply arrived.
    #[error("connection closed")]
    Closed,
    /// A session id failed validation.
    #[error("invalid session id: {0}")]
    InvalidSession(#[from] stamplink_canonical::ValidationError),
}

impl PeerError {
    /// Returns true if the failure means the host cannot be reached right now.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, PeerError::Unreachable(_) | PeerError::Timeout(_))
    }
}
