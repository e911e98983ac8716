//! Direct device-to-device notification channel for StampLink.
//!
//! This crate provides:
//! - A length-prefixed frame format for JSON peer messages
//! - Async reader/writer halves over any byte stream
//! - `PeerTransport` with TCP and in-process implementations
//! - The host role (`PeerHost`) and the caller role (`PeerCaller`)
//!
//! The channel is advisory. Nothing received here is a ledger write; an
//! `ADD_STAMP` only reports a mutation the ledger already committed.
//!
//! Frame layout: `kind: u8`, three reserved zero bytes, `len: u32` LE, then
//! `len` bytes of payload (at most 64 KiB). Each session starts with the
//! four-byte preamble `SLP1` sent by the caller.

#![deny(missing_docs)]

/// Caller role.
pub mod caller;
/// Error types for peer operations.
pub mod errors;
/// Frame structure and serialization.
pub mod frame;
/// Host role.
pub mod host;
/// Peer message types.
pub mod message;
/// Frame reader.
pub mod reader;
/// Transports.
pub mod transport;
/// Frame writer.
pub mod writer;

pub use caller::{PeerCaller, DEFAULT_PEER_TIMEOUT};
pub use errors::PeerError;
pub use frame::{FrameHeader, FrameKind};
pub use host::{HostHandler, PeerHost};
pub use message::PeerMessage;
pub use reader::MessageReader;
pub use transport::{
    BoxedStream, MemoryTransport, PeerListener, PeerStream, PeerTransport, TcpTransport,
};
pub use writer::MessageWriter;
