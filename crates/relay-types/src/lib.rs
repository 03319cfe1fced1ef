//! Shared domain types for the relay write path.
//!
//! Every crate in the workspace speaks in these types: the packed identity
//! record that travels alongside each event's JSON, the acceptance verdicts
//! produced by write policies, the terminal write statuses assigned by the
//! storage engine, and the `OK` acknowledgement returned to clients.
//!
//! The storage collaborator contract ([`EventStore`] / [`WriteTxn`]) also
//! lives here so that the storage engine and the writer can be built and
//! tested independently of each other.

mod event;
mod source;
mod store;
mod write;

pub use event::{verify_event, EventError, PackedEvent, PACKED_EVENT_LEN};
pub use source::{InvalidSourceAddress, SourceFamily};
pub use store::{EventStore, StoreError, WriteTxn};
pub use write::{ConnId, OkResponse, PreparedEvent, Verdict, WriteStatus};
