//! Fatal startup errors.
//!
//! Anything in here ends the process before (or instead of) serving.
//! Accept and connection errors are not fatal and live next to the code
//! that absorbs them.

use crate::config::{ConfigError, StartupConfigError, ValidationError};
use crate::net::{ListenerError, TlsSetupError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Inputs(#[from] StartupConfigError),

    #[error(transparent)]
    Tls(#[from] TlsSetupError),

    #[error(transparent)]
    Listen(#[from] ListenerError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

impl From<Vec<ValidationError>> for StartupError {
    fn from(errors: Vec<ValidationError>) -> Self {
        StartupError::Config(ConfigError::Validation(errors))
    }
}
