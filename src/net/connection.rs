//! Negotiated connections and lifecycle tracking.
//!
//! # Responsibilities
//! - Expose the application protocol fixed by the TLS layer
//! - Generate unique connection IDs for tracing
//! - Track live connection tasks (Accepted → Serving → Closed)

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::observability::metrics;

/// ALPN identifier for HTTP/1.1.
pub const ALPN_HTTP11: &[u8] = b"http/1.1";

/// ALPN identifier for HTTP/2 over TLS.
pub const ALPN_H2: &[u8] = b"h2";

/// Source of `conn-N` identifiers; only uniqueness matters.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Application protocol selected during the TLS handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiatedProtocol {
    Http11,
    Http2,
}

impl NegotiatedProtocol {
    /// Map an ALPN identifier to a protocol this server can serve.
    pub fn from_alpn_id(id: &[u8]) -> Option<Self> {
        if id == ALPN_H2 {
            Some(NegotiatedProtocol::Http2)
        } else if id == ALPN_HTTP11 {
            Some(NegotiatedProtocol::Http11)
        } else {
            None
        }
    }

    /// Protocol to serve given the handshake's ALPN result.
    ///
    /// A client that offered no ALPN extension speaks HTTP/1.1.
    pub fn from_alpn(selected: Option<&[u8]>) -> Self {
        selected
            .and_then(Self::from_alpn_id)
            .unwrap_or(NegotiatedProtocol::Http11)
    }

    pub fn alpn_id(&self) -> &'static [u8] {
        match self {
            NegotiatedProtocol::Http11 => ALPN_HTTP11,
            NegotiatedProtocol::Http2 => ALPN_H2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiatedProtocol::Http11 => "http/1.1",
            NegotiatedProtocol::Http2 => "h2",
        }
    }
}

impl std::fmt::Display for NegotiatedProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A byte stream whose handshake and protocol negotiation are complete.
///
/// Implementors only report the outcome; nothing downstream re-negotiates.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    fn negotiated_protocol(&self) -> NegotiatedProtocol;
}

impl<IO> Connection for tokio_rustls::server::TlsStream<IO>
where
    IO: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    fn negotiated_protocol(&self) -> NegotiatedProtocol {
        NegotiatedProtocol::from_alpn(self.get_ref().1.alpn_protocol())
    }
}

/// A stream whose protocol was decided out of band.
///
/// Lets any transport (in-memory pipes, pre-terminated sockets) be handed to
/// the engines the same way a TLS stream is.
#[derive(Debug)]
pub struct PreNegotiated<IO> {
    io: IO,
    protocol: NegotiatedProtocol,
}

impl<IO> PreNegotiated<IO> {
    pub fn new(io: IO, protocol: NegotiatedProtocol) -> Self {
        Self { io, protocol }
    }
}

impl<IO> Connection for PreNegotiated<IO>
where
    IO: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    fn negotiated_protocol(&self) -> NegotiatedProtocol {
        self.protocol
    }
}

impl<IO: AsyncRead + Unpin> AsyncRead for PreNegotiated<IO> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl<IO: AsyncWrite + Unpin> AsyncWrite for PreNegotiated<IO> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }
}

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Per-connection state as seen by the accept loop.
///
/// There is no negotiating state: negotiation finished before the
/// connection was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handed to a task, not yet given to an engine.
    Accepted,
    /// An engine is driving the connection.
    Serving,
    /// The engine returned; the stream has been dropped.
    Closed,
}

/// Counts live connection tasks.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly accepted connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        let active = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_active_connections(active);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
            state: ConnectionState::Accepted,
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
    state: ConnectionState,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Mark the connection as handed to an engine.
    pub fn serving(&mut self) {
        self.state = ConnectionState::Serving;
    }

    /// Mark the engine as finished with the connection.
    pub fn closed(&mut self) {
        self.state = ConnectionState::Closed;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let active = self.active_count.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::set_active_connections(active);
        tracing::trace!(connection_id = %self.id, state = ?self.state, "Connection released");
    }
}
