//! TLS 1.3 server configuration.
//!
//! Turns a [`ServerConfiguration`] into a rustls `ServerConfig`: TLS 1.3
//! only, ALPN in configured preference order, session-ticket policy, and
//! the certificate entry. Without a certificate entry an ephemeral
//! self-signed certificate is generated for the configured hostname.

use std::sync::Arc;

use rcgen::CertifiedKey;
use rustls::crypto::aws_lc_rs;
use rustls::ServerConfig;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use crate::config::ServerConfiguration;

#[derive(Debug, thiserror::Error)]
pub enum TlsSetupError {
    #[error("invalid TLS configuration: {0}")]
    Rustls(#[from] rustls::Error),

    #[error("failed to generate ephemeral certificate for {hostname}: {source}")]
    Ephemeral {
        hostname: String,
        #[source]
        source: rcgen::Error,
    },
}

/// Build the rustls server configuration shared by every handshake.
pub fn build_server_config(config: &ServerConfiguration) -> Result<Arc<ServerConfig>, TlsSetupError> {
    let (chain, key) = match config.certificate() {
        Some(entry) => (entry.chain().to_vec(), entry.key().clone_key()),
        None => {
            tracing::warn!(
                hostname = config.hostname(),
                "No certificate configured; using an ephemeral self-signed certificate"
            );
            ephemeral_certificate(config.hostname())?
        }
    };

    let mut server = ServerConfig::builder_with_provider(Arc::new(aws_lc_rs::default_provider()))
        .with_protocol_versions(&[&rustls::version::TLS13])?
        .with_no_client_auth()
        .with_single_cert(chain, key)?;

    server.alpn_protocols = config.alpn_protocols().to_vec();

    if config.session_tickets() {
        server.ticketer = aws_lc_rs::Ticketer::new()?;
    } else {
        server.send_tls13_tickets = 0;
    }

    Ok(Arc::new(server))
}

fn ephemeral_certificate(
    hostname: &str,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), TlsSetupError> {
    let CertifiedKey { cert, key_pair } = rcgen::generate_simple_self_signed(vec![hostname.to_string()])
        .map_err(|source| TlsSetupError::Ephemeral {
            hostname: hostname.to_string(),
            source,
        })?;

    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
    Ok((vec![cert.der().clone()], key))
}
