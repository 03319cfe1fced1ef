//! The relay's event write path.
//!
//! Connection handlers on any thread push submitted events (and connection
//! close notices) into the [`Inbox`]. A single writer thread drains it in
//! batches and, for each batch:
//!
//! 1. drops events from connections that closed within the same batch;
//! 2. decodes each event and runs it past the [`WritePolicy`];
//! 3. commits every accepted event in one read-write transaction;
//! 4. sends exactly one `OK` acknowledgement per decoded event.
//!
//! Rejections are acknowledged immediately and never touch storage. A
//! storage failure fails the whole batch uniformly: every event in it gets
//! the same error acknowledgement and nothing is assumed written.
//!
//! The storage engine requires serialized read-write transactions, so the
//! [`Inbox`] has exactly one receiver and it is owned by the writer thread.
//!
//! [`WritePolicy`]: relay_policy::WritePolicy

mod commit;
mod error;
mod inbox;
mod prepare;
mod respond;
mod writer;

pub use commit::commit_events;
pub use error::DecodeError;
pub use inbox::{filter_closed, inbox, CandidateEvent, Inbox, InboxSender, WriterMsg};
pub use prepare::{decode_payload, prepare_events};
pub use respond::{status_response, Responder};
pub use writer::{spawn_writer, CycleReport, Writer};
