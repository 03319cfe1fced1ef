//! Startup and shutdown errors for the server binary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Pool(#[from] relay_db::PoolError),

    #[error("failed to get database connection: {0}")]
    Connection(#[from] r2d2::Error),

    #[error("failed to run database migrations: {0}")]
    Migration(#[from] relay_db::MigrationError),

    #[error("failed to open writer connection: {0}")]
    Store(#[from] relay_db::DbError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("writer thread panicked")]
    WriterPanicked,
}
