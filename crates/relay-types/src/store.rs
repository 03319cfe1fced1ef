//! Storage collaborator contract.
//!
//! The writer only ever opens a read-write transaction, hands it the whole
//! accepted batch, and commits. Identity, deduplication and replacement rules
//! belong to the implementation behind these traits.

use crate::write::PreparedEvent;

/// Errors surfaced by a storage engine while writing a batch.
///
/// Every variant fails the whole batch it occurred in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The read-write transaction could not be opened.
    #[error("failed to open write transaction: {0}")]
    Begin(String),

    /// Writing the batch failed.
    #[error("{0}")]
    Write(String),

    /// The transaction could not be committed.
    #[error("failed to commit: {0}")]
    Commit(String),
}

/// A storage engine that accepts batched event writes.
pub trait EventStore {
    /// An open read-write transaction. Dropping it without calling
    /// [`WriteTxn::commit`] must discard every change made through it.
    type Txn<'a>: WriteTxn
    where
        Self: 'a;

    /// Opens a read-write transaction. Only one may be open at a time.
    fn txn_rw(&mut self) -> Result<Self::Txn<'_>, StoreError>;
}

/// Operations available inside a read-write transaction.
pub trait WriteTxn {
    /// Writes `events` in order, setting each event's `status`.
    fn write_events(&mut self, events: &mut [PreparedEvent]) -> Result<(), StoreError>;

    /// Durably commits everything written through this transaction.
    fn commit(self) -> Result<(), StoreError>;
}
