//! Error types for the write path.

use relay_types::{EventError, InvalidSourceAddress};

/// Per-event decode failures.
///
/// The display text is sent to the client as the acknowledgement message,
/// so every variant starts with the `invalid:` prefix.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The packed identity record is malformed.
    #[error("invalid: malformed event record ({0})")]
    Record(#[from] EventError),

    /// The event JSON does not parse.
    #[error("invalid: malformed event JSON ({0})")]
    Json(#[from] serde_json::Error),

    /// The source address has an unsupported length.
    #[error("invalid: {0}")]
    SourceAddress(#[from] InvalidSourceAddress),
}
