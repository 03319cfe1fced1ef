//! The writer loop: one batch at a time, one transaction per batch.

use crate::commit::commit_events;
use crate::inbox::{filter_closed, Inbox, WriterMsg};
use crate::prepare::prepare_events;
use crate::respond::{respond_committed, respond_failed, Responder};
use relay_policy::WritePolicy;
use relay_types::EventStore;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Counters for a single writer cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Events in the drained batch.
    pub received: usize,
    /// Events dropped because their connection closed in the same batch.
    pub filtered: usize,
    pub decode_errors: usize,
    pub rejected: usize,
    pub shadow_rejected: usize,
    /// Events handed to the commit step.
    pub accepted: usize,
    pub written: usize,
    pub duplicate: usize,
    pub replaced: usize,
    pub deleted: usize,
    /// Accepted events acknowledged with an error because the batch failed.
    pub commit_failed: usize,
    /// Read-write transactions attempted (zero or one).
    pub transactions: usize,
}

impl CycleReport {
    /// Total acknowledgements sent during the cycle.
    pub fn acknowledged(&self) -> usize {
        self.decode_errors
            + self.rejected
            + self.shadow_rejected
            + self.written
            + self.duplicate
            + self.replaced
            + self.deleted
            + self.commit_failed
    }
}

/// The single consumer of the inbox.
///
/// Owns the storage handle, the write policy and the responder. Nothing
/// else may open read-write transactions on the same store.
pub struct Writer<S, P, R> {
    store: S,
    policy: P,
    responder: R,
}

impl<S, P, R> Writer<S, P, R>
where
    S: EventStore,
    P: WritePolicy,
    R: Responder,
{
    pub fn new(store: S, policy: P, responder: R) -> Self {
        Self {
            store,
            policy,
            responder,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Processes one drained batch end to end.
    ///
    /// Every event that survives the closed-connection filter receives
    /// exactly one acknowledgement before this returns. A transaction is
    /// opened only if at least one event was accepted.
    pub fn run_cycle(&mut self, batch: Vec<WriterMsg>) -> CycleReport {
        let mut report = CycleReport {
            received: batch
                .iter()
                .filter(|msg| matches!(msg, WriterMsg::AddEvent(_)))
                .count(),
            ..CycleReport::default()
        };

        let candidates = filter_closed(batch);
        report.filtered = report.received - candidates.len();
        if report.filtered > 0 {
            debug!(
                count = report.filtered,
                "dropped events from closed connections"
            );
        }

        let mut events =
            prepare_events(candidates, &mut self.policy, &self.responder, &mut report);
        if events.is_empty() {
            return report;
        }

        report.transactions = 1;
        match commit_events(&mut self.store, &mut events) {
            Ok(()) => respond_committed(&self.responder, &events, &mut report),
            Err(e) => {
                error!(count = events.len(), error = %e, "failed to write event batch");
                respond_failed(&self.responder, &events, &e, &mut report);
            }
        }

        report
    }

    /// Runs cycles until every inbox sender has been dropped.
    pub fn run(mut self, inbox: Inbox) {
        info!("writer started");
        while let Some(batch) = inbox.drain_batch() {
            let report = self.run_cycle(batch);
            debug!(
                received = report.received,
                accepted = report.accepted,
                written = report.written,
                acknowledged = report.acknowledged(),
                "writer cycle complete"
            );
        }
        info!("inbox closed, writer stopping");
    }
}

/// Starts the writer on its own thread.
///
/// The thread exits once every [`InboxSender`] is dropped and the queued
/// messages have been processed.
///
/// [`InboxSender`]: crate::InboxSender
pub fn spawn_writer<S, P, R>(
    store: S,
    policy: P,
    responder: R,
    inbox: Inbox,
) -> std::io::Result<JoinHandle<()>>
where
    S: EventStore + Send + 'static,
    P: WritePolicy + 'static,
    R: Responder + 'static,
{
    thread::Builder::new()
        .name("relay-writer".to_string())
        .spawn(move || Writer::new(store, policy, responder).run(inbox))
}
