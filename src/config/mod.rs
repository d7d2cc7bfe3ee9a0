//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional) + CLI flags
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerSettings (paths and policies)
//!     → builder.rs (read + parse cert, key, payload)
//!     → ServerConfiguration (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once built; there is no reload
//! - All fields have defaults to allow running with no file at all
//! - Any certificate, key or payload problem is fatal before binding

pub mod builder;
pub mod loader;
pub mod schema;
pub mod validation;

pub use builder::{CertificateEntry, ServerConfiguration, ServerConfigurationBuilder, StartupConfigError};
pub use loader::{load_settings, ConfigError};
pub use schema::{
    AdmissionConfig, ListenerConfig, LogFormat, ObservabilityConfig, ResponseConfig,
    ServerSettings, TlsConfig,
};
pub use validation::{validate_config, ValidationError};
