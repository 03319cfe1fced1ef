//! The batch commit: one read-write transaction for all accepted events.

use relay_types::{EventStore, PreparedEvent, StoreError, WriteTxn};

/// Writes `events` in a single transaction and commits it.
///
/// On success every event carries the status the storage engine assigned.
/// If the engine leaves any event without a status the transaction is
/// rolled back and the batch fails. On any error nothing is committed.
pub fn commit_events<S: EventStore>(
    store: &mut S,
    events: &mut [PreparedEvent],
) -> Result<(), StoreError> {
    let mut txn = store.txn_rw()?;
    txn.write_events(events)?;

    if let Some(event) = events.iter().find(|e| e.status.is_none()) {
        // Dropping the transaction rolls it back.
        return Err(StoreError::Write(format!(
            "no write status assigned to event {}",
            event.packed.id_hex()
        )));
    }

    txn.commit()
}
