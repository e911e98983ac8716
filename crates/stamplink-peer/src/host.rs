//! Host role: the member device's long-lived listening session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stamplink_canonical::PeerSessionId;
use stamplink_core::Member;
use tokio::io::split;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::PeerError;
use crate::message::PeerMessage;
use crate::reader::MessageReader;
use crate::transport::{BoxedStream, PeerTransport};
use crate::writer::MessageWriter;

/// Application side of a host.
///
/// `on_add_stamp` receives a notification about stamps already committed to
/// the ledger. Implementations apply it as a local, provisional change only.
#[async_trait]
pub trait HostHandler: Send + Sync + 'static {
    /// Current in-memory profile, served to `GET_PROFILE`.
    fn profile(&self) -> Option<Member>;

    /// Handles `ADD_STAMP`. The return value is sent back as `STAMP_ACK`.
    async fn on_add_stamp(&self, count: u32) -> bool;

    /// Handles `SCAN_ALERT`.
    fn on_scan_alert(&self);
}

/// A running host. Dropping it closes the listening session.
pub struct PeerHost {
    session_id: PeerSessionId,
    task: JoinHandle<()>,
}

impl PeerHost {
    /// Opens a listening session on `transport` and starts serving it.
    pub async fn start(
        transport: &dyn PeerTransport,
        handler: Arc<dyn HostHandler>,
    ) -> Result<Self, PeerError> {
        let mut listener = transport.listen().await?;
        let session_id = listener.session_id().clone();
        info!(session = %session_id, "peer host listening");

        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok(stream) => {
                        let handler = Arc::clone(&handler);
                        tokio::spawn(async move {
                            if let Err(e) = serve(stream, handler).await {
                                debug!(error = %e, "peer session ended with error");
                            }
                        });
                    }
                    Err(PeerError::Closed) => break,
                    Err(e) => {
                        warn!(error = %e, "peer accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        });

        Ok(Self { session_id, task })
    }

    /// Session id to embed in the member's code.
    pub fn session_id(&self) -> &PeerSessionId {
        &self.session_id
    }

    /// Stops accepting connections and releases the session id.
    pub fn shutdown(&self) {
        self.task.abort();
    }

    /// Returns true once the accept loop has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PeerHost {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serves one inbound connection until the caller closes it.
async fn serve(stream: BoxedStream, handler: Arc<dyn HostHandler>) -> Result<(), PeerError> {
    let (read_half, write_half) = split(stream);
    let mut reader = MessageReader::new(read_half);
    let mut writer = MessageWriter::new(write_half);

    reader.read_preamble().await?;
    while let Some(message) = reader.recv().await? {
        debug!(message = message.name(), "peer message received");
        match message {
            PeerMessage::GetProfile => {
                let user = handler.profile();
                writer.send(&PeerMessage::ProfileData { user }).await?;
            }
            PeerMessage::AddStamp { count } => {
                let success = handler.on_add_stamp(count).await;
                writer.send(&PeerMessage::StampAck { success }).await?;
            }
            PeerMessage::ScanAlert => handler.on_scan_alert(),
            other => warn!(message = other.name(), "ignoring reply-type message sent to host"),
        }
    }
    Ok(())
}
