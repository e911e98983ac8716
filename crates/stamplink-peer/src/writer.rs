//! Frame writer.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::errors::PeerError;
use crate::frame::{FrameHeader, FrameKind, MAGIC};
use crate::message::PeerMessage;

/// Writes framed peer messages to an async byte stream.
pub struct MessageWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    /// Wraps a stream.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Sends the session preamble. Callers do this once per connection.
    pub async fn write_preamble(&mut self) -> Result<(), PeerError> {
        self.inner.write_all(MAGIC).await?;
        Ok(())
    }

    /// Sends one message as a `Message` frame and flushes.
    pub async fn send(&mut self, message: &PeerMessage) -> Result<(), PeerError> {
        let payload = serde_json::to_vec(message)?;
        self.send_raw(FrameKind::Message, &payload).await
    }

    /// Sends a raw frame with the given kind and payload.
    pub async fn send_raw(&mut self, kind: FrameKind, payload: &[u8]) -> Result<(), PeerError> {
        let header = FrameHeader::new(kind, payload.len())?;
        self.inner.write_all(&header.to_bytes()).await?;
        self.inner.write_all(payload).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Shuts the write side down so the other end sees end-of-stream.
    pub async fn finish(mut self) -> Result<(), PeerError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
