//! TLS listener implementation.
//!
//! # Responsibilities
//! - Bind to the configured address (failure is fatal)
//! - Accept TCP connections and complete the TLS 1.3 handshake, ALPN included
//! - Yield connections whose negotiated protocol is already fixed
//!
//! # Design Decisions
//! - Handshakes run in their own tasks, never on the accept loop
//! - Completed handshakes and failures share one bounded queue. A slot is
//!   reserved before each TCP accept, so when nobody calls accept() the
//!   listener stops taking sockets once the queue depth is reached
//! - Once the TCP accept task is gone, every accept() reports `Closed`

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;

use crate::net::connection::Connection;

/// Completed handshakes waiting for the accept loop.
const HANDSHAKE_QUEUE_DEPTH: usize = 128;

/// Error type for binding the listener.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// A single failed accept. Never terminal for the accept loop.
#[derive(Debug, thiserror::Error)]
pub enum AcceptError {
    #[error("failed to accept TCP connection: {0}")]
    Io(#[from] io::Error),

    #[error("TLS handshake with {peer} failed: {source}")]
    Handshake {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("TLS handshake with {peer} timed out after {timeout:?}")]
    HandshakeTimeout { peer: SocketAddr, timeout: Duration },

    #[error("listener is closed")]
    Closed,
}

/// Source of negotiated connections.
pub trait Accept: Send + 'static {
    type Conn: Connection;

    /// Wait for the next connection or failure.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<(Self::Conn, SocketAddr), AcceptError>> + Send;
}

type Handshaken = Result<(TlsStream<TcpStream>, SocketAddr), AcceptError>;

/// Listening socket that hands out TLS-terminated connections.
pub struct TlsListener {
    local_addr: SocketAddr,
    incoming: mpsc::Receiver<Handshaken>,
    accept_task: JoinHandle<()>,
}

impl TlsListener {
    /// Bind and start accepting handshakes in the background.
    pub async fn bind(
        addr: SocketAddr,
        tls: Arc<rustls::ServerConfig>,
        handshake_timeout: Option<Duration>,
    ) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind { addr, source })?;

        tracing::info!(address = %local_addr, "Listener bound");

        let (tx, incoming) = mpsc::channel(HANDSHAKE_QUEUE_DEPTH);
        let acceptor = TlsAcceptor::from(tls);
        let accept_task = tokio::spawn(accept_tcp(listener, acceptor, handshake_timeout, tx));

        Ok(Self {
            local_addr,
            incoming,
            accept_task,
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting new TCP connections. Later accept() calls fail with
    /// [`AcceptError::Closed`] once queued handshakes are drained.
    pub fn close(&self) {
        self.accept_task.abort();
    }
}

impl Accept for TlsListener {
    type Conn = TlsStream<TcpStream>;

    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<(Self::Conn, SocketAddr), AcceptError>> + Send {
        async move { self.incoming.recv().await.unwrap_or(Err(AcceptError::Closed)) }
    }
}

impl Drop for TlsListener {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_tcp(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    handshake_timeout: Option<Duration>,
    tx: mpsc::Sender<Handshaken>,
) {
    loop {
        // A queue slot is reserved before a socket is taken, so handshakes in
        // flight plus connections not yet accepted never exceed the depth.
        let Ok(slot) = tx.clone().reserve_owned().await else {
            break;
        };

        let accepted = tokio::select! {
            _ = tx.closed() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    let result = handshake(&acceptor, stream, peer, handshake_timeout)
                        .await
                        .map(|tls| (tls, peer));
                    slot.send(result);
                });
            }
            Err(e) => {
                slot.send(Err(AcceptError::Io(e)));
            }
        }
    }
}

async fn handshake(
    acceptor: &TlsAcceptor,
    stream: TcpStream,
    peer: SocketAddr,
    timeout: Option<Duration>,
) -> Result<TlsStream<TcpStream>, AcceptError> {
    let accepting = acceptor.accept(stream);
    let result = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, accepting)
            .await
            .map_err(|_| AcceptError::HandshakeTimeout { peer, timeout })?,
        None => accepting.await,
    };
    let tls = result.map_err(|source| AcceptError::Handshake { peer, source })?;

    tracing::trace!(
        peer_addr = %peer,
        alpn = ?tls.get_ref().1.alpn_protocol().map(String::from_utf8_lossy),
        "TLS handshake complete"
    );
    Ok(tls)
}
