//! Connection seam for the peer channel.
//!
//! A host listens under a session id; a caller connects to that id and gets a
//! byte stream. `TcpTransport` addresses hosts by `host:port`. The in-process
//! `MemoryTransport` hands out uuid session ids and pipes bytes through
//! `tokio::io::duplex`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use stamplink_canonical::PeerSessionId;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::PeerError;
use crate::frame::{FRAME_HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// Bidirectional byte stream carrying one peer session.
pub trait PeerStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> PeerStream for T {}

/// Boxed stream returned by transports.
pub type BoxedStream = Box<dyn PeerStream>;

/// Accepts inbound sessions for one host.
#[async_trait]
pub trait PeerListener: Send {
    /// Session id callers use to reach this listener.
    fn session_id(&self) -> &PeerSessionId;

    /// Waits for the next inbound connection. `Closed` once the listener can
    /// accept no more.
    async fn accept(&mut self) -> Result<BoxedStream, PeerError>;
}

/// Creates listeners and outbound connections.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Opens a listening session.
    async fn listen(&self) -> Result<Box<dyn PeerListener>, PeerError>;

    /// Connects to the host listening under `session`.
    async fn connect(&self, session: &PeerSessionId) -> Result<BoxedStream, PeerError>;
}

/// TCP transport. Session ids are socket addresses.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    bind: String,
}

impl TcpTransport {
    /// Creates a transport whose listeners bind to `bind` (e.g. `0.0.0.0:0`).
    pub fn new(bind: impl Into<String>) -> Self {
        Self { bind: bind.into() }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new("127.0.0.1:0")
    }
}

struct TcpPeerListener {
    listener: TcpListener,
    session_id: PeerSessionId,
}

#[async_trait]
impl PeerListener for TcpPeerListener {
    fn session_id(&self) -> &PeerSessionId {
        &self.session_id
    }

    async fn accept(&mut self) -> Result<BoxedStream, PeerError> {
        let (stream, remote) = self.listener.accept().await?;
        debug!(%remote, "peer connection accepted");
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

#[async_trait]
impl PeerTransport for TcpTransport {
    async fn listen(&self) -> Result<Box<dyn PeerListener>, PeerError> {
        let listener = TcpListener::bind(&self.bind).await?;
        let session_id = PeerSessionId::parse(listener.local_addr()?.to_string())?;
        Ok(Box::new(TcpPeerListener {
            listener,
            session_id,
        }))
    }

    async fn connect(&self, session: &PeerSessionId) -> Result<BoxedStream, PeerError> {
        let stream = TcpStream::connect(session.as_str())
            .await
            .map_err(|e| PeerError::Unreachable(format!("{session}: {e}")))?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

type Registry = Arc<Mutex<HashMap<PeerSessionId, mpsc::Sender<DuplexStream>>>>;

/// In-process transport. Sessions live as long as their listener.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    sessions: Registry,
}

impl MemoryTransport {
    /// Creates an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live listening sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

struct MemoryListener {
    session_id: PeerSessionId,
    inbound: mpsc::Receiver<DuplexStream>,
    sessions: Registry,
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        self.sessions.lock().remove(&self.session_id);
    }
}

#[async_trait]
impl PeerListener for MemoryListener {
    fn session_id(&self) -> &PeerSessionId {
        &self.session_id
    }

    async fn accept(&mut self) -> Result<BoxedStream, PeerError> {
        match self.inbound.recv().await {
            Some(stream) => Ok(Box::new(stream)),
            None => Err(PeerError::Closed),
        }
    }
}

#[async_trait]
impl PeerTransport for MemoryTransport {
    async fn listen(&self) -> Result<Box<dyn PeerListener>, PeerError> {
        let session_id = PeerSessionId::parse(uuid::Uuid::new_v4().to_string())?;
        let (tx, rx) = mpsc::channel(16);
        self.sessions.lock().insert(session_id.clone(), tx);
        Ok(Box::new(MemoryListener {
            session_id,
            inbound: rx,
            sessions: Arc::clone(&self.sessions),
        }))
    }

    async fn connect(&self, session: &PeerSessionId) -> Result<BoxedStream, PeerError> {
        let sender = self
            .sessions
            .lock()
            .get(session)
            .cloned()
            .ok_or_else(|| PeerError::Unreachable(format!("no session {session}")))?;

        let (local, remote) = tokio::io::duplex(MAX_PAYLOAD_SIZE as usize + FRAME_HEADER_SIZE);
        sender
            .send(remote)
            .await
            .map_err(|_| PeerError::Unreachable(format!("session {session} closed")))?;
        Ok(Box::new(local))
    }
}
