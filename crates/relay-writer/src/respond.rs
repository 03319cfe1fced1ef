//! Acknowledgements for committed (or failed) batches.

use crate::writer::CycleReport;
use relay_types::{ConnId, OkResponse, PreparedEvent, StoreError, WriteStatus};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Delivers acknowledgements to connections.
///
/// Delivery is best effort. A connection that has gone away simply drops
/// the message; implementations must not report that back to the writer.
pub trait Responder: Send {
    fn send_ok(&self, conn_id: ConnId, response: &OkResponse);
}

impl<R: Responder + Sync + ?Sized> Responder for Arc<R> {
    fn send_ok(&self, conn_id: ConnId, response: &OkResponse) {
        (**self).send_ok(conn_id, response)
    }
}

/// Maps a write status to its acknowledgement `(success, message)`.
pub fn status_response(status: WriteStatus) -> (bool, &'static str) {
    match status {
        WriteStatus::Written => (true, ""),
        WriteStatus::Duplicate => (true, "duplicate: have this event"),
        WriteStatus::Replaced => (false, "replaced: have newer event"),
        WriteStatus::Deleted => (false, "deleted: user requested deletion"),
    }
}

/// Acknowledgement message for an event whose batch could not be stored.
pub(crate) fn write_error_message(error: &StoreError) -> String {
    format!("Write error: {error}")
}

/// Acknowledges every event of a committed batch, in batch order.
///
/// An event left without a status is acknowledged as a failed write.
pub(crate) fn respond_committed<R: Responder + ?Sized>(
    responder: &R,
    events: &[PreparedEvent],
    report: &mut CycleReport,
) {
    for event in events {
        let event_id = event.packed.id_hex();
        let Some(status) = event.status else {
            warn!(conn_id = %event.conn_id, %event_id, "committed event has no write status");
            report.commit_failed += 1;
            let error = StoreError::Write(format!("no write status assigned to event {event_id}"));
            responder.send_ok(
                event.conn_id,
                &OkResponse::new(event_id, false, write_error_message(&error)),
            );
            continue;
        };

        match status {
            WriteStatus::Written => {
                report.written += 1;
                info!(
                    conn_id = %event.conn_id,
                    %event_id,
                    lev_id = event.lev_id,
                    "inserted event"
                );
            }
            WriteStatus::Duplicate => report.duplicate += 1,
            WriteStatus::Replaced => report.replaced += 1,
            WriteStatus::Deleted => report.deleted += 1,
        }
        if status != WriteStatus::Written {
            debug!(
                conn_id = %event.conn_id,
                %event_id,
                status = status.as_str(),
                "event not inserted"
            );
        }

        let (success, message) = status_response(status);
        responder.send_ok(event.conn_id, &OkResponse::new(event_id, success, message));
    }
}

/// Acknowledges every event of a failed batch with the same error.
pub(crate) fn respond_failed<R: Responder + ?Sized>(
    responder: &R,
    events: &[PreparedEvent],
    error: &StoreError,
    report: &mut CycleReport,
) {
    let message = write_error_message(error);
    for event in events {
        report.commit_failed += 1;
        responder.send_ok(
            event.conn_id,
            &OkResponse::new(event.packed.id_hex(), false, message.as_str()),
        );
    }
}
