use crate::errors::PeerError;

/// Session preamble sent by the caller before its first frame: `b"SLP1"`.
pub const MAGIC: &[u8; 4] = b"SLP1";

/// Frame header size in bytes: 8 bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Maximum payload size: 64 KiB. A profile with a long history fits comfortably.
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

/// Frame kind: JSON-encoded peer message.
pub const FRAME_KIND_MESSAGE: u8 = 0x01;

/// Frame kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// UTF-8 JSON object holding one [`PeerMessage`](crate::PeerMessage).
    Message,
    /// Unknown/unsupported frame kind.
    Unknown(u8),
}

impl FrameKind {
    /// Creates a FrameKind from a byte value.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            FRAME_KIND_MESSAGE => FrameKind::Message,
            _ => FrameKind::Unknown(byte),
        }
    }

    /// Returns the byte value for this kind.
    pub fn to_byte(self) -> u8 {
        match self {
            FrameKind::Message => FRAME_KIND_MESSAGE,
            FrameKind::Unknown(b) => b,
        }
    }
}

/// Frame header: kind byte, three reserved zero bytes, u32 LE payload length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame kind.
    pub kind: FrameKind,
    /// Payload length in bytes.
    pub len: u32,
}

impl FrameHeader {
    /// Creates a header, rejecting payloads above [`MAX_PAYLOAD_SIZE`].
    pub fn new(kind: FrameKind, len: usize) -> Result<Self, PeerError> {
        let len = u32::try_from(len)
            .ok()
            .filter(|len| *len <= MAX_PAYLOAD_SIZE)
            .ok_or(PeerError::PayloadTooLarge {
                size: len,
                max: MAX_PAYLOAD_SIZE,
            })?;
        Ok(Self { kind, len })
    }

    /// Serializes the header.
    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut bytes = [0u8; FRAME_HEADER_SIZE];
        bytes[0] = self.kind.to_byte();
        bytes[4..8].copy_from_slice(&self.len.to_le_bytes());
        bytes
    }

    /// Parses a header received from a peer.
    pub fn from_bytes(bytes: &[u8; FRAME_HEADER_SIZE]) -> Result<Self, PeerError> {
        if bytes[1..4] != [0u8; 3] {
            return Err(PeerError::Frame("non-zero reserved bytes".to_string()));
        }
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if len > MAX_PAYLOAD_SIZE {
            return Err(PeerError::PayloadTooLarge {
                size: len as usize,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Self {
            kind: FrameKind::from_byte(bytes[0]),
            len,
        })
    }
}

/// Checks a received session preamble.
pub fn check_magic(bytes: &[u8; 4]) -> Result<(), PeerError> {
    if bytes != MAGIC {
        return Err(PeerError::Frame(format!(
            "invalid session magic: {bytes:?}, expected {MAGIC:?}"
        )));
    }
    Ok(())
}
