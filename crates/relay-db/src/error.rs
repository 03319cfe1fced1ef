//! Error types for the storage engine.

/// Errors that can occur while reading or writing events.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A pooled connection could not be checked out.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Stored or submitted event JSON could not be parsed.
    #[error("event json error: {0}")]
    Json(#[from] serde_json::Error),
}
