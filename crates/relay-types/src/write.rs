//! Verdicts, write statuses, prepared events and acknowledgements.

use crate::event::PackedEvent;
use crate::source::SourceFamily;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Identifier of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnId(pub u64);

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a write policy decision.
///
/// Each variant carries the policy's message. `ShadowReject` looks exactly
/// like `Reject` to the client; the difference is only visible server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Store the event.
    Accept(String),
    /// Refuse the event.
    Reject(String),
    /// Refuse the event without distinguishing it from `Reject` to the client.
    ShadowReject(String),
}

/// Terminal classification assigned by the storage engine during a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteStatus {
    /// The event was newly stored.
    Written,
    /// An event with the same id is already stored.
    Duplicate,
    /// A newer event supersedes this one.
    Replaced,
    /// The author has requested deletion of this event.
    Deleted,
}

impl WriteStatus {
    /// Returns the canonical label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Written => "written",
            Self::Duplicate => "duplicate",
            Self::Replaced => "replaced",
            Self::Deleted => "deleted",
        }
    }
}

/// An accepted event on its way into storage.
///
/// Built by the writer after decoding and policy checks; the storage engine
/// fills in `status` (and `lev_id` for newly stored events) during the write.
#[derive(Debug, Clone)]
pub struct PreparedEvent {
    /// Connection that submitted the event and receives its acknowledgement.
    pub conn_id: ConnId,
    /// Packed identity record.
    pub packed: PackedEvent,
    /// Event JSON exactly as received.
    pub json: String,
    /// Receipt timestamp, in seconds since the epoch.
    pub received_at: u64,
    /// Address family of the submitting client.
    pub source: SourceFamily,
    /// Raw source address bytes (empty for imports).
    pub source_addr: Vec<u8>,
    /// Set by the storage engine; `None` until written.
    pub status: Option<WriteStatus>,
    /// Storage row id of a newly written event.
    pub lev_id: Option<u64>,
}

impl PreparedEvent {
    /// Creates a prepared event with no status assigned yet.
    pub fn new(
        conn_id: ConnId,
        packed: PackedEvent,
        json: String,
        received_at: u64,
        source: SourceFamily,
        source_addr: Vec<u8>,
    ) -> Self {
        Self {
            conn_id,
            packed,
            json,
            received_at,
            source,
            source_addr,
            status: None,
            lev_id: None,
        }
    }
}

/// Acknowledgement of a submitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkResponse {
    /// Lowercase hex of the event's content id.
    pub event_id: String,
    /// Whether the relay holds the event.
    pub success: bool,
    /// Human-readable reason; empty when there is nothing to say.
    pub message: String,
}

impl OkResponse {
    pub fn new(event_id: impl Into<String>, success: bool, message: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            success,
            message: message.into(),
        }
    }

    /// Serialises the acknowledgement to the client frame
    /// `["OK", <event id>, <success>, <message>]`.
    pub fn to_frame(&self) -> String {
        json!(["OK", self.event_id, self.success, self.message]).to_string()
    }
}
