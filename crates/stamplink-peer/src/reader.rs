//! Frame reader.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::errors::PeerError;
use crate::frame::{check_magic, FrameHeader, FrameKind, FRAME_HEADER_SIZE};
use crate::message::PeerMessage;

/// Reads framed peer messages from an async byte stream.
///
/// End-of-stream exactly at a frame boundary is a clean close (`None`);
/// anywhere else it is [`PeerError::Closed`].
pub struct MessageReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    /// Wraps a stream.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads and checks the session preamble.
    pub async fn read_preamble(&mut self) -> Result<(), PeerError> {
        let mut magic = [0u8; 4];
        if !self.fill(&mut magic).await? {
            return Err(PeerError::Closed);
        }
        check_magic(&magic)
    }

    /// Reads the next frame, or `None` on a clean close.
    pub async fn read_frame(&mut self) -> Result<Option<(FrameKind, Vec<u8>)>, PeerError> {
        let mut header_bytes = [0u8; FRAME_HEADER_SIZE];
        if !self.fill(&mut header_bytes).await? {
            return Ok(None);
        }
        let header = FrameHeader::from_bytes(&header_bytes)?;

        let mut payload = vec![0u8; header.len as usize];
        if !payload.is_empty() && !self.fill(&mut payload).await? {
            return Err(PeerError::Closed);
        }
        Ok(Some((header.kind, payload)))
    }

    /// Reads the next message, or `None` on a clean close.
    pub async fn recv(&mut self) -> Result<Option<PeerMessage>, PeerError> {
        match self.read_frame().await? {
            None => Ok(None),
            Some((FrameKind::Message, payload)) => Ok(Some(serde_json::from_slice(&payload)?)),
            Some((FrameKind::Unknown(kind), _)) => {
                Err(PeerError::Frame(format!("unsupported frame kind 0x{kind:02x}")))
            }
        }
    }

    /// Fills `buf` completely. Returns `false` if the stream ended before the
    /// first byte, and `Closed` if it ended part way.
    async fn fill(&mut self, buf: &mut [u8]) -> Result<bool, PeerError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.inner.read(&mut buf[filled..]).await?;
            if n == 0 {
                return if filled == 0 {
                    Ok(false)
                } else {
                    Err(PeerError::Closed)
                };
            }
            filled += n;
        }
        Ok(true)
    }
}
