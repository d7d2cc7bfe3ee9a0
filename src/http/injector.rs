//! Raw connection injection.
//!
//! The injector reads which protocol the TLS layer selected and passes the
//! connection straight into that protocol's engine together with the
//! static responder. It never inspects bytes and never renegotiates.

use crate::http::engine::{EngineError, Http1Engine, Http2Engine, ProtocolEngine};
use crate::http::responder::StaticResponder;
use crate::net::connection::{Connection, NegotiatedProtocol};

/// Routes negotiated connections to the engine for their protocol.
///
/// One instance is shared by every connection task.
#[derive(Debug, Clone)]
pub struct ProtocolInjector<H2 = Http2Engine, H1 = Http1Engine> {
    http2: H2,
    http1: H1,
    responder: StaticResponder,
}

impl ProtocolInjector {
    /// hyper-backed engines for both protocols.
    pub fn new(responder: StaticResponder) -> Self {
        Self::with_engines(Http2Engine::new(), Http1Engine::new(), responder)
    }
}

impl<H2, H1> ProtocolInjector<H2, H1>
where
    H2: ProtocolEngine,
    H1: ProtocolEngine,
{
    pub fn with_engines(http2: H2, http1: H1, responder: StaticResponder) -> Self {
        Self {
            http2,
            http1,
            responder,
        }
    }

    /// Serve `conn` until its session ends.
    ///
    /// Errors belong to this connection alone.
    pub async fn inject<C: Connection>(&self, conn: C) -> Result<(), EngineError> {
        let handler = self.responder.clone();
        match conn.negotiated_protocol() {
            NegotiatedProtocol::Http2 => self.http2.serve_connection(handler, conn).await,
            NegotiatedProtocol::Http11 => self.http1.serve_connection(handler, conn).await,
        }
    }
}
