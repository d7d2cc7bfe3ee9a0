//! tls13-zone: serve one payload over TLS 1.3 with HTTP/2 or HTTP/1.1.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use tls13_zone::config::{load_settings, validate_config, ServerConfiguration, ServerSettings};
use tls13_zone::http::{ConnectionAcceptor, ProtocolInjector, StaticResponder};
use tls13_zone::net::{build_server_config, TlsListener};
use tls13_zone::observability::{logging, metrics};
use tls13_zone::StartupError;

/// TLS 1.3 server that answers every request with a fixed payload
#[derive(Parser, Debug)]
#[command(name = "tls13-zone", version, about)]
struct Args {
    /// Port to listen on [default: 4430]
    #[arg(long)]
    port: Option<u16>,

    /// Server hostname [default: example.com]
    #[arg(long)]
    host: Option<String>,

    /// Certificate chain in PEM or DER
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Private key in PEM format
    #[arg(long)]
    key: Option<PathBuf>,

    /// File to serve
    #[arg(long)]
    response: Option<PathBuf>,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter (e.g., "tls13_zone=debug")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Cap on concurrently served connections (unbounded if unset)
    #[arg(long)]
    max_connections: Option<usize>,

    /// Address for the Prometheus metrics endpoint
    #[arg(long)]
    metrics_address: Option<SocketAddr>,
}

impl Args {
    /// Layer command-line values over file (or default) settings.
    fn apply(&self, settings: &mut ServerSettings) {
        if let Some(port) = self.port {
            settings.listener.port = port;
        }
        if let Some(host) = &self.host {
            settings.tls.hostname = host.clone();
        }
        if let Some(cert) = &self.cert {
            settings.tls.cert_path = Some(cert.clone());
        }
        if let Some(key) = &self.key {
            settings.tls.key_path = Some(key.clone());
        }
        if let Some(response) = &self.response {
            settings.response.path = Some(response.clone());
        }
        if let Some(max) = self.max_connections {
            settings.admission.max_connections = Some(max);
        }
        if let Some(addr) = self.metrics_address {
            settings.observability.metrics_address = Some(addr);
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => load_settings(path),
        None => Ok(ServerSettings::default()),
    }
    .map(|mut settings| {
        args.apply(&mut settings);
        settings
    });

    let observability = settings
        .as_ref()
        .map(|s| s.observability.clone())
        .unwrap_or_default();
    let env_filter = std::env::var("RUST_LOG").ok();
    let filter = logging::resolve_filter(
        args.log_level.as_deref(),
        env_filter.as_deref(),
        &observability.log_filter,
    );
    logging::init_logging(&filter, observability.log_format);

    let result = match settings {
        Ok(settings) => run(settings).await,
        Err(e) => Err(e.into()),
    };

    if let Err(err) = result {
        tracing::error!(error = %err, "Startup failed");
        std::process::exit(1);
    }
}

async fn run(settings: ServerSettings) -> Result<(), StartupError> {
    validate_config(&settings)?;

    tracing::info!(
        cert = ?settings.tls.cert_path,
        key = ?settings.tls.key_path,
        port = settings.listener.port,
        hostname = %settings.tls.hostname,
        max_connections = ?settings.admission.max_connections,
        "Configuration loaded"
    );

    let configuration = ServerConfiguration::load(&settings)?;
    if configuration.certificate().is_some() {
        tracing::info!(
            cert = ?settings.tls.cert_path,
            key = ?settings.tls.key_path,
            "Loaded certificate"
        );
    }
    let tls = build_server_config(&configuration)?;

    if let Some(addr) = settings.observability.metrics_address {
        metrics::init_metrics(addr)?;
    }

    // Validated above, so the address parses.
    let addr = settings
        .listener
        .socket_addr()
        .map_err(|_| vec![tls13_zone::config::ValidationError::BindAddress(
            settings.listener.bind_address.clone(),
        )])?;
    let listener = TlsListener::bind(addr, tls, settings.listener.handshake_timeout()).await?;
    tracing::info!(port = listener.local_addr().port(), "Listening");

    let injector = ProtocolInjector::new(StaticResponder::new(configuration.payload().clone()));
    let acceptor = ConnectionAcceptor::new(listener, injector, &settings.admission);
    match acceptor.run().await {}
}
