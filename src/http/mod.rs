//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Negotiated connection (TLS + ALPN already done)
//!     → server.rs (accept loop, one task per connection)
//!     → injector.rs (read negotiated protocol, pick engine)
//!     → engine.rs (hyper HTTP/2 or HTTP/1.1, frame serving only)
//!     → responder.rs (same payload for every request)
//!     → Response bytes on the same connection
//! ```

pub mod engine;
pub mod injector;
pub mod responder;
pub mod server;

pub use engine::{EngineError, Http1Engine, Http2Engine, ProtocolEngine};
pub use injector::ProtocolInjector;
pub use responder::StaticResponder;
pub use server::ConnectionAcceptor;
