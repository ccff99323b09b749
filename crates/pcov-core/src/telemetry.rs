//! # Tracing Initialisation
//!
//! Library crates only emit `tracing` events. Embedders call
//! [`init_tracing`] once to install a subscriber; `RUST_LOG` takes
//! precedence over the configured filter.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global `tracing` subscriber described by `config`.
///
/// Returns `false` if a subscriber was already installed, which is not an
/// error: tests and embedders may race to initialise.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.is_ok()
}
