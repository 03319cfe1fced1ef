//! Multi-producer, single-consumer inbox feeding the writer.

use crossbeam_channel::{Receiver, Sender};
use relay_types::ConnId;
use std::collections::HashSet;

/// An event submitted by a client, exactly as handed over by the transport.
#[derive(Debug, Clone)]
pub struct CandidateEvent {
    /// Connection that submitted the event.
    pub conn_id: ConnId,
    /// Packed identity record built by the ingest side.
    pub packed: Vec<u8>,
    /// Event JSON as received.
    pub json: String,
    /// Receipt timestamp, in seconds since the epoch.
    pub received_at: u64,
    /// Raw source address: 4 bytes (IPv4), 16 bytes (IPv6), or empty for
    /// local imports.
    pub ip_addr: Vec<u8>,
}

/// A message for the writer.
#[derive(Debug, Clone)]
pub enum WriterMsg {
    /// An event to decode, check and store.
    AddEvent(CandidateEvent),
    /// The connection has gone away.
    CloseConn { conn_id: ConnId },
}

/// Creates a connected inbox pair.
///
/// The sender may be cloned freely across connection threads. The receiving
/// [`Inbox`] cannot be cloned; whoever owns it is the only writer.
pub fn inbox() -> (InboxSender, Inbox) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (InboxSender { tx }, Inbox { rx })
}

/// Producer handle for the writer inbox.
#[derive(Debug, Clone)]
pub struct InboxSender {
    tx: Sender<WriterMsg>,
}

impl InboxSender {
    /// Queues an event. Returns `false` if the writer has stopped.
    pub fn add_event(&self, event: CandidateEvent) -> bool {
        self.send(WriterMsg::AddEvent(event))
    }

    /// Notifies the writer that a connection closed. Returns `false` if the
    /// writer has stopped.
    pub fn close_conn(&self, conn_id: ConnId) -> bool {
        self.send(WriterMsg::CloseConn { conn_id })
    }

    /// Queues any writer message. Returns `false` if the writer has stopped.
    pub fn send(&self, msg: WriterMsg) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// The writer's end of the inbox.
#[derive(Debug)]
pub struct Inbox {
    rx: Receiver<WriterMsg>,
}

impl Inbox {
    /// Blocks until at least one message is queued, then returns every
    /// message queued at that moment, in arrival order.
    ///
    /// Messages that arrive while the batch is being collected are left for
    /// the next call. Returns `None` once every sender has been dropped and
    /// the queue is empty.
    pub fn drain_batch(&self) -> Option<Vec<WriterMsg>> {
        let first = self.rx.recv().ok()?;
        let queued = self.rx.len();

        let mut batch = Vec::with_capacity(queued + 1);
        batch.push(first);
        batch.extend(self.rx.try_iter().take(queued));
        Some(batch)
    }
}

/// Removes events whose connection closed within the same batch.
///
/// Two passes: first collect every connection named by a close notice, then
/// keep the events from all other connections in their original order.
/// Close notices themselves are consumed.
pub fn filter_closed(batch: Vec<WriterMsg>) -> Vec<CandidateEvent> {
    let closed: HashSet<ConnId> = batch
        .iter()
        .filter_map(|msg| match msg {
            WriterMsg::CloseConn { conn_id } => Some(*conn_id),
            WriterMsg::AddEvent(_) => None,
        })
        .collect();

    batch
        .into_iter()
        .filter_map(|msg| match msg {
            WriterMsg::AddEvent(event) if !closed.contains(&event.conn_id) => Some(event),
            WriterMsg::AddEvent(_) | WriterMsg::CloseConn { .. } => None,
        })
        .collect()
}
