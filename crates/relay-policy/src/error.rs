//! Error types for write policies.

/// Internal failures of a write policy plugin.
///
/// These never reach the client as such: the plugin policy turns every one
/// of them into a rejection and restarts the plugin on the next decision.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// The plugin process could not be started.
    #[error("failed to start plugin '{command}': {source}")]
    Spawn {
        /// The configured plugin command.
        command: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Reading from or writing to the plugin failed.
    #[error("plugin I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The plugin closed its output.
    #[error("plugin closed its output")]
    Closed,

    /// The plugin's response was not valid JSON of the expected shape.
    #[error("invalid plugin response: {0}")]
    Protocol(#[from] serde_json::Error),

    /// The plugin answered for a different event.
    #[error("plugin responded for event {got}, expected {expected}")]
    IdMismatch {
        /// The event id the writer asked about.
        expected: String,
        /// The event id in the plugin's response.
        got: String,
    },
}
