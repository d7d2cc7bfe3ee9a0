//! Configuration schema definitions.
//!
//! These are the startup settings as read from the optional TOML file and
//! the command line. They still hold file paths; `ServerConfiguration`
//! is what they turn into once certificate, key, and payload are loaded.

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::AcceptBackoff;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 4430;

/// Default server hostname.
pub const DEFAULT_HOSTNAME: &str = "example.com";

/// Payload served when no response file is configured.
pub const DEFAULT_PAYLOAD: &str = "Welcome to the TLS 1.3 zone!";

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "tls13_zone=info";

/// ALPN identifiers advertised by default, in preference order.
pub const DEFAULT_ALPN_PROTOCOLS: [&str; 2] = ["http/1.1", "h2"];

/// Root startup settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerSettings {
    /// Listening socket.
    pub listener: ListenerConfig,

    /// Certificate, key, hostname and handshake options.
    pub tls: TlsConfig,

    /// Payload source.
    pub response: ResponseConfig,

    /// Connection admission and accept-error pacing.
    pub admission: AdmissionConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_address: String,

    /// TCP port.
    pub port: u16,

    /// Optional bound on a single TLS handshake. Absent means no bound.
    pub handshake_timeout_secs: Option<u64>,
}

impl ListenerConfig {
    /// The socket address to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.bind_address.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn handshake_timeout(&self) -> Option<Duration> {
        self.handshake_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            handshake_timeout_secs: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Server hostname.
    pub hostname: String,

    /// Certificate chain file (PEM or DER).
    pub cert_path: Option<PathBuf>,

    /// Private key file (PEM).
    pub key_path: Option<PathBuf>,

    /// ALPN identifiers in server preference order.
    pub alpn_protocols: Vec<String>,

    /// Issue TLS 1.3 session tickets.
    pub session_tickets: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            cert_path: None,
            key_path: None,
            alpn_protocols: DEFAULT_ALPN_PROTOCOLS.iter().map(|p| p.to_string()).collect(),
            session_tickets: true,
        }
    }
}

/// Response payload configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResponseConfig {
    /// File whose exact bytes are served. Absent means the default literal.
    pub path: Option<PathBuf>,
}

/// Admission policy for the accept loop.
///
/// The defaults reproduce an unbounded server that retries failed accepts
/// immediately.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum concurrently served connections. Absent means unbounded.
    pub max_connections: Option<usize>,

    /// Pause applied after a failed accept.
    pub accept_backoff: AcceptBackoff,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive.
    pub log_filter: String,

    pub log_format: LogFormat,

    /// Prometheus scrape endpoint. Absent disables the exporter.
    pub metrics_address: Option<SocketAddr>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::default(),
            metrics_address: None,
        }
    }
}
