//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, backoff bounds ordered)
//! - Reject ALPN identifiers no engine can serve
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerSettings → Result<(), Vec<ValidationError>>
//! - Runs before any file is read or socket bound

use crate::config::schema::ServerSettings;
use crate::net::connection::NegotiatedProtocol;
use crate::resilience::AcceptBackoff;

/// A single semantic problem in the settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not an IP address")]
    BindAddress(String),

    #[error("tls.hostname must not be empty")]
    EmptyHostname,

    #[error("tls.alpn_protocols must not be empty")]
    EmptyAlpn,

    #[error("tls.alpn_protocols entry {0:?} is not supported (expected \"http/1.1\" or \"h2\")")]
    UnsupportedAlpn(String),

    #[error("tls.alpn_protocols lists {0:?} more than once")]
    DuplicateAlpn(String),

    #[error("admission.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("admission.accept_backoff requires 0 < base_ms <= max_ms (got base_ms={base_ms}, max_ms={max_ms})")]
    BackoffBounds { base_ms: u64, max_ms: u64 },
}

/// Check settings for semantic errors.
pub fn validate_config(settings: &ServerSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.listener.socket_addr().is_err() {
        errors.push(ValidationError::BindAddress(
            settings.listener.bind_address.clone(),
        ));
    }

    if settings.tls.hostname.trim().is_empty() {
        errors.push(ValidationError::EmptyHostname);
    }

    let alpn = &settings.tls.alpn_protocols;
    if alpn.is_empty() {
        errors.push(ValidationError::EmptyAlpn);
    }
    for (i, protocol) in alpn.iter().enumerate() {
        if NegotiatedProtocol::from_alpn_id(protocol.as_bytes()).is_none() {
            errors.push(ValidationError::UnsupportedAlpn(protocol.clone()));
        } else if alpn[..i].contains(protocol) {
            errors.push(ValidationError::DuplicateAlpn(protocol.clone()));
        }
    }

    if settings.admission.max_connections == Some(0) {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    if let AcceptBackoff::Exponential { base_ms, max_ms } = settings.admission.accept_backoff {
        if base_ms == 0 || base_ms > max_ms {
            errors.push(ValidationError::BackoffBounds { base_ms, max_ms });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
