//! Caller role: one transient connection per operation.

use std::sync::Arc;
use std::time::Duration;

use stamplink_canonical::PeerSessionId;
use stamplink_core::Member;
use tokio::io::split;
use tracing::debug;

use crate::errors::PeerError;
use crate::message::PeerMessage;
use crate::reader::MessageReader;
use crate::transport::PeerTransport;
use crate::writer::MessageWriter;

/// Default bound on a whole peer exchange.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to hosts. Every operation connects, sends one request, awaits at
/// most one reply and drops the connection, all within `timeout`.
#[derive(Clone)]
pub struct PeerCaller {
    transport: Arc<dyn PeerTransport>,
    timeout: Duration,
}

impl PeerCaller {
    /// Creates a caller.
    pub fn new(transport: Arc<dyn PeerTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Bound applied to each operation.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn exchange(
        &self,
        target: &PeerSessionId,
        request: PeerMessage,
        expect_reply: bool,
    ) -> Result<Option<PeerMessage>, PeerError> {
        let operation = async {
            let stream = self.transport.connect(target).await?;
            let (read_half, write_half) = split(stream);
            let mut writer = MessageWriter::new(write_half);
            writer.write_preamble().await?;
            writer.send(&request).await?;

            if !expect_reply {
                writer.finish().await?;
                return Ok(None);
            }

            let mut reader = MessageReader::new(read_half);
            match reader.recv().await? {
                Some(reply) => Ok(Some(reply)),
                None => Err(PeerError::Closed),
            }
        };

        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => result,
            Err(_) => {
                debug!(session = %target, request = request.name(), "peer exchange timed out");
                Err(PeerError::Timeout(self.timeout))
            }
        }
    }

    /// Fetches the host's current profile.
    pub async fn fetch_profile(&self, target: &PeerSessionId) -> Result<Option<Member>, PeerError> {
        match self.exchange(target, PeerMessage::GetProfile, true).await? {
            Some(PeerMessage::ProfileData { user }) => Ok(user),
            other => Err(unexpected(other)),
        }
    }

    /// Tells the host that `count` stamps were committed. Returns the host's ack.
    pub async fn send_stamp_signal(
        &self,
        target: &PeerSessionId,
        count: u32,
    ) -> Result<bool, PeerError> {
        match self
            .exchange(target, PeerMessage::AddStamp { count }, true)
            .await?
        {
            Some(PeerMessage::StampAck { success }) => Ok(success),
            other => Err(unexpected(other)),
        }
    }

    /// Tells the host its code is being scanned.
    pub async fn send_scan_alert(&self, target: &PeerSessionId) -> Result<(), PeerError> {
        self.exchange(target, PeerMessage::ScanAlert, false).await?;
        Ok(())
    }
}

fn unexpected(reply: Option<PeerMessage>) -> PeerError {
    PeerError::UnexpectedReply(
        reply
            .map(|m| m.name().to_string())
            .unwrap_or_else(|| "none".to_string()),
    )
}
