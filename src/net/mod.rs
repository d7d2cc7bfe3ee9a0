//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (TCP accept, TLS 1.3 handshake + ALPN off the accept loop)
//!     → admission.rs (optional connection limit)
//!     → connection.rs (negotiated protocol, lifecycle tracking)
//!     → Hand off to HTTP layer
//!
//! Connection States (as seen by the accept loop):
//!     Accepted → Serving → Closed
//! ```
//!
//! # Design Decisions
//! - Negotiation happens exactly once, inside the TLS layer
//! - A failed bind is fatal; a failed accept never is
//! - tls.rs owns every rustls setting; nothing else touches ServerConfig

pub mod admission;
pub mod connection;
pub mod listener;
pub mod tls;

pub use admission::{AdmissionControl, ConnectionPermit};
pub use connection::{Connection, ConnectionTracker, NegotiatedProtocol, PreNegotiated};
pub use listener::{Accept, AcceptError, ListenerError, TlsListener};
pub use tls::{build_server_config, TlsSetupError};
