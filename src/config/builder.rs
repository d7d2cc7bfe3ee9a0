//! Immutable server configuration.
//!
//! `ServerConfiguration` is built once at startup and shared read-only by
//! the TLS layer and every connection task. Certificate and key bytes are
//! parsed here; a parse failure is fatal and happens before any socket is
//! opened.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use x509_parser::parse_x509_certificate;

use crate::config::schema::{ServerSettings, DEFAULT_PAYLOAD};

/// Fatal problems with the startup inputs.
#[derive(Debug, thiserror::Error)]
pub enum StartupConfigError {
    #[error("failed to read {kind} file {path}: {source}")]
    Read {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("certificate chain is neither PEM nor DER: {0}")]
    Certificate(String),

    #[error("private key could not be parsed: {0}")]
    PrivateKey(String),
}

/// One certificate chain with its private key.
pub struct CertificateEntry {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl CertificateEntry {
    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }

    pub fn key(&self) -> &PrivateKeyDer<'static> {
        &self.key
    }
}

impl Clone for CertificateEntry {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            key: self.key.clone_key(),
        }
    }
}

impl std::fmt::Debug for CertificateEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateEntry")
            .field("chain_len", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// Startup parameters after every input has been loaded and parsed.
#[derive(Debug, Clone)]
pub struct ServerConfiguration {
    hostname: String,
    alpn_protocols: Vec<Vec<u8>>,
    certificate: Option<CertificateEntry>,
    session_tickets: bool,
    payload: Bytes,
}

impl ServerConfiguration {
    pub fn builder(hostname: impl Into<String>) -> ServerConfigurationBuilder {
        ServerConfigurationBuilder::new(hostname)
    }

    /// Read certificate, key and payload files named by `settings`.
    pub fn load(settings: &ServerSettings) -> Result<Self, StartupConfigError> {
        let mut builder = Self::builder(settings.tls.hostname.clone())
            .alpn_protocols(settings.tls.alpn_protocols.iter().map(|p| p.as_bytes().to_vec()))
            .session_tickets(settings.tls.session_tickets);

        if let Some(path) = &settings.tls.cert_path {
            builder = builder.certificate_chain(read_file("certificate", path)?);
        }
        if let Some(path) = &settings.tls.key_path {
            builder = builder.private_key(read_file("private key", path)?);
        }
        if let Some(path) = &settings.response.path {
            tracing::info!(path = %path.display(), "Loading response file");
            builder = builder.payload(read_file("response", path)?);
        }

        builder.build()
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// ALPN identifiers in server preference order.
    pub fn alpn_protocols(&self) -> &[Vec<u8>] {
        &self.alpn_protocols
    }

    /// The single certificate entry, if both chain and key were supplied.
    pub fn certificate(&self) -> Option<&CertificateEntry> {
        self.certificate.as_ref()
    }

    pub fn session_tickets(&self) -> bool {
        self.session_tickets
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

fn read_file(kind: &'static str, path: &Path) -> Result<Vec<u8>, StartupConfigError> {
    fs::read(path).map_err(|source| StartupConfigError::Read {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

/// Assembles a [`ServerConfiguration`] from raw bytes.
#[derive(Debug, Clone)]
pub struct ServerConfigurationBuilder {
    hostname: String,
    alpn_protocols: Vec<Vec<u8>>,
    chain: Option<Vec<u8>>,
    key: Option<Vec<u8>>,
    payload: Option<Bytes>,
    session_tickets: bool,
}

impl ServerConfigurationBuilder {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            alpn_protocols: crate::config::schema::DEFAULT_ALPN_PROTOCOLS
                .iter()
                .map(|p| p.as_bytes().to_vec())
                .collect(),
            chain: None,
            key: None,
            payload: None,
            session_tickets: true,
        }
    }

    pub fn alpn_protocols(mut self, protocols: impl IntoIterator<Item = Vec<u8>>) -> Self {
        self.alpn_protocols = protocols.into_iter().collect();
        self
    }

    /// Certificate chain bytes, PEM or DER.
    pub fn certificate_chain(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.chain = Some(bytes.into());
        self
    }

    /// Private key bytes, PEM.
    pub fn private_key(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.key = Some(bytes.into());
        self
    }

    pub fn payload(mut self, bytes: impl Into<Bytes>) -> Self {
        self.payload = Some(bytes.into());
        self
    }

    pub fn session_tickets(mut self, enabled: bool) -> Self {
        self.session_tickets = enabled;
        self
    }

    /// Parse the supplied material.
    ///
    /// A chain without a key (or a key without a chain) is still parsed, then
    /// dropped: the configuration ends up with no certificate entry.
    pub fn build(self) -> Result<ServerConfiguration, StartupConfigError> {
        let chain = self.chain.as_deref().map(parse_certificate_chain).transpose()?;
        let key = self.key.as_deref().map(parse_private_key).transpose()?;

        let certificate = match (chain, key) {
            (Some(chain), Some(key)) => Some(CertificateEntry { chain, key }),
            (Some(_), None) => {
                tracing::warn!("Certificate chain supplied without a private key; ignoring it");
                None
            }
            (None, Some(_)) => {
                tracing::warn!("Private key supplied without a certificate chain; ignoring it");
                None
            }
            (None, None) => None,
        };

        Ok(ServerConfiguration {
            hostname: self.hostname,
            alpn_protocols: self.alpn_protocols,
            certificate,
            session_tickets: self.session_tickets,
            payload: self
                .payload
                .unwrap_or_else(|| Bytes::from_static(DEFAULT_PAYLOAD.as_bytes())),
        })
    }
}

/// Parse a certificate chain, trying PEM first and DER second.
pub fn parse_certificate_chain(
    bytes: &[u8],
) -> Result<Vec<CertificateDer<'static>>, StartupConfigError> {
    let pem = rustls_pemfile::certs(&mut &bytes[..]).collect::<Result<Vec<_>, _>>();
    match pem {
        Ok(chain) if !chain.is_empty() => return Ok(chain),
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "PEM certificate parse failed; trying DER"),
    }

    let chain = parse_der_certificates(bytes)?;
    if chain.is_empty() {
        return Err(StartupConfigError::Certificate(
            "no PEM certificate and no DER certificate found".to_string(),
        ));
    }
    Ok(chain)
}

/// Parse a PEM private key (PKCS#1, PKCS#8 or SEC1).
pub fn parse_private_key(bytes: &[u8]) -> Result<PrivateKeyDer<'static>, StartupConfigError> {
    rustls_pemfile::private_key(&mut &bytes[..])
        .map_err(|e| StartupConfigError::PrivateKey(e.to_string()))?
        .ok_or_else(|| StartupConfigError::PrivateKey("no PEM private key found".to_string()))
}

/// Parse concatenated DER X.509 certificates. Every element must be a
/// complete certificate; trailing bytes are an error.
fn parse_der_certificates(bytes: &[u8]) -> Result<Vec<CertificateDer<'static>>, StartupConfigError> {
    let mut chain = Vec::new();
    let mut rest = bytes;

    while !rest.is_empty() {
        let (remaining, _) = parse_x509_certificate(rest).map_err(|e| {
            StartupConfigError::Certificate(format!(
                "certificate {} in DER chain: {e}",
                chain.len() + 1
            ))
        })?;
        let consumed = rest.len() - remaining.len();
        chain.push(CertificateDer::from(rest[..consumed].to_vec()));
        rest = remaining;
    }

    Ok(chain)
}
