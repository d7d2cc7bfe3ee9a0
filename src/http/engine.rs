//! Protocol engines.
//!
//! An engine drives one already-negotiated connection to completion. It
//! starts directly in its frame (or message) serving state: the TLS
//! handshake and ALPN happened upstream and are never repeated here.
//!
//! Swapping the HTTP implementation means providing another
//! [`ProtocolEngine`]; the accept loop does not change.

use std::future::Future;

use hyper::server::conn::{http1, http2};
use hyper_util::rt::{TokioExecutor, TokioIo};

use crate::http::responder::StaticResponder;
use crate::net::connection::{Connection, NegotiatedProtocol};

/// A connection ended with a protocol or I/O error.
///
/// Only ever logged; it never leaves the connection's task.
#[derive(Debug, thiserror::Error)]
#[error("{protocol} connection failed: {source}")]
pub struct EngineError {
    protocol: NegotiatedProtocol,
    #[source]
    source: hyper::Error,
}

impl EngineError {
    pub fn new(protocol: NegotiatedProtocol, source: hyper::Error) -> Self {
        Self { protocol, source }
    }

    pub fn protocol(&self) -> NegotiatedProtocol {
        self.protocol
    }

    /// The peer went away before the engine finished writing.
    pub fn is_disconnect(&self) -> bool {
        self.source.is_incomplete_message() || self.source.is_canceled()
    }
}

/// Raw-connection entry point of an HTTP engine.
///
/// Implementations must be safe to call concurrently from any number of
/// connection tasks.
pub trait ProtocolEngine: Send + Sync + 'static {
    /// Serve `conn` with `handler` until the peer or the engine ends the session.
    fn serve_connection<C: Connection>(
        &self,
        handler: StaticResponder,
        conn: C,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// HTTP/2 engine backed by hyper.
#[derive(Debug, Clone)]
pub struct Http2Engine {
    builder: http2::Builder<TokioExecutor>,
}

impl Http2Engine {
    pub fn new() -> Self {
        Self::with_builder(http2::Builder::new(TokioExecutor::new()))
    }

    /// Use a pre-tuned builder (window sizes, stream limits, ...).
    pub fn with_builder(builder: http2::Builder<TokioExecutor>) -> Self {
        Self { builder }
    }
}

impl Default for Http2Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolEngine for Http2Engine {
    fn serve_connection<C: Connection>(
        &self,
        handler: StaticResponder,
        conn: C,
    ) -> impl Future<Output = Result<(), EngineError>> + Send {
        // The client preface is the first thing read; no upgrade or ALPN step.
        let serving = self.builder.serve_connection(TokioIo::new(conn), handler);
        async move {
            serving
                .await
                .map_err(|e| EngineError::new(NegotiatedProtocol::Http2, e))
        }
    }
}

/// HTTP/1.1 engine backed by hyper.
#[derive(Debug, Clone)]
pub struct Http1Engine {
    builder: http1::Builder,
}

impl Http1Engine {
    pub fn new() -> Self {
        Self::with_builder(http1::Builder::new())
    }

    pub fn with_builder(builder: http1::Builder) -> Self {
        Self { builder }
    }
}

impl Default for Http1Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolEngine for Http1Engine {
    fn serve_connection<C: Connection>(
        &self,
        handler: StaticResponder,
        conn: C,
    ) -> impl Future<Output = Result<(), EngineError>> + Send {
        let serving = self.builder.serve_connection(TokioIo::new(conn), handler);
        async move {
            serving
                .await
                .map_err(|e| EngineError::new(NegotiatedProtocol::Http11, e))
        }
    }
}
