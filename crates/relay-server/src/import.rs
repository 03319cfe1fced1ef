//! Local event import: one JSON event per input line.

use relay_types::{verify_event, ConnId, EventError, PackedEvent};
use relay_writer::{CandidateEvent, InboxSender};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Connection id used for events read from standard input.
pub const IMPORT_CONN: ConnId = ConnId(1);

/// Why an import line was skipped.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid event: {0}")]
    Event(#[from] EventError),
}

/// Counters for an import run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    /// Lines handed to the writer.
    pub submitted: usize,
    /// Lines skipped because they did not hold a valid event.
    pub invalid: usize,
}

/// Builds a candidate event from one line of input.
///
/// Both the content id and the signature must verify. Imported events
/// carry no source address.
pub fn parse_import_line(line: &str, received_at: u64) -> Result<CandidateEvent, ImportError> {
    let line = line.trim();
    let event = verify_event(line)?;
    let packed = PackedEvent::from_event(&event);

    Ok(CandidateEvent {
        conn_id: IMPORT_CONN,
        packed: packed.into_bytes(),
        json: line.to_string(),
        received_at,
        ip_addr: Vec::new(),
    })
}

/// Current time in seconds since the epoch.
pub fn now_secs() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Reads events from `reader` and queues them for the writer.
///
/// Blank lines are ignored; invalid lines are logged and skipped. Stops at
/// end of input or when the writer is no longer accepting events.
pub async fn import_lines<R>(reader: R, inbox: &InboxSender) -> std::io::Result<ImportStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = ImportStats::default();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        match parse_import_line(&line, now_secs()) {
            Ok(candidate) => {
                if !inbox.add_event(candidate) {
                    tracing::warn!(line = line_no, "writer stopped, ending import");
                    break;
                }
                stats.submitted += 1;
            }
            Err(e) => {
                stats.invalid += 1;
                tracing::warn!(line = line_no, error = %e, "skipping invalid import line");
            }
        }
    }

    Ok(stats)
}
