//! TLS 1.3 static-payload server.
//!
//! Terminates TLS 1.3, lets ALPN pick HTTP/2 or HTTP/1.1, and answers every
//! request on every connection with one configured payload.
//!
//! ```text
//!  TlsListener ──accept()──▶ ConnectionAcceptor ──spawn──▶ ProtocolInjector
//!  (handshake + ALPN)        (one loop, forever)           │
//!                                                          ├─ h2       → Http2Engine ─┐
//!                                                          └─ http/1.1 → Http1Engine ─┴▶ StaticResponder
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::{ServerConfiguration, ServerSettings};
pub use error::StartupError;
pub use http::{ConnectionAcceptor, ProtocolInjector, StaticResponder};
pub use net::TlsListener;
