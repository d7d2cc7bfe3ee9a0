//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Filter priority: CLI > RUST_LOG > config file

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::LogFormat;

/// Pick the active filter directive.
pub fn resolve_filter(cli: Option<&str>, env: Option<&str>, configured: &str) -> String {
    cli.or(env).unwrap_or(configured).to_string()
}

/// Install the global subscriber.
pub fn init_logging(filter: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(EnvFilter::new(filter));
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}
