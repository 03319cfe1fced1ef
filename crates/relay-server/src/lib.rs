//! Relay server wiring: configuration, acknowledgement routing and the
//! local import front-end around the writer.

pub mod config;
pub mod connections;
pub mod error;
pub mod import;

pub use connections::ConnectionRegistry;
pub use error::ServerError;

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// An unparsable level filter falls back to `info`.
pub fn init_tracing(logging: &config::LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Acknowledgement frames go to stdout; logs stay on stderr.
    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
