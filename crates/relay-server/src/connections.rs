//! Outbound acknowledgement delivery to client connections.

use relay_types::{ConnId, OkResponse};
use relay_writer::Responder;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Routes acknowledgements from the writer to each connection's outbound
/// queue.
///
/// Each connection owns a bounded channel of serialized frames. Sends never
/// block the writer: frames for unknown, closed or backed-up connections are
/// dropped and logged at debug.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    senders: Arc<RwLock<HashMap<ConnId, mpsc::Sender<String>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the receiving end of its
    /// outbound queue. A previous registration under the same id is
    /// replaced.
    pub fn register(&self, conn_id: ConnId, capacity: usize) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let mut senders = self.senders.write().unwrap_or_else(|e| e.into_inner());
        senders.insert(conn_id, tx);
        rx
    }

    /// Forgets a connection. Returns `false` if it was not registered.
    pub fn unregister(&self, conn_id: ConnId) -> bool {
        let mut senders = self.senders.write().unwrap_or_else(|e| e.into_inner());
        senders.remove(&conn_id).is_some()
    }
}

impl Responder for ConnectionRegistry {
    fn send_ok(&self, conn_id: ConnId, response: &OkResponse) {
        let senders = self.senders.read().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = senders.get(&conn_id) else {
            tracing::debug!(
                %conn_id,
                event_id = %response.event_id,
                "dropping acknowledgement for unknown connection"
            );
            return;
        };

        if let Err(e) = sender.try_send(response.to_frame()) {
            tracing::debug!(
                %conn_id,
                event_id = %response.event_id,
                "dropping acknowledgement: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(tag: &str) -> OkResponse {
        OkResponse::new(tag.repeat(32), true, "")
    }

    #[tokio::test]
    async fn frames_reach_the_registered_connection() {
        let registry = ConnectionRegistry::new();
        let mut rx1 = registry.register(ConnId(1), 8);
        let mut rx2 = registry.register(ConnId(2), 8);

        registry.send_ok(ConnId(2), &ok("bb"));
        registry.send_ok(ConnId(1), &ok("aa"));

        assert_eq!(rx1.recv().await, Some(ok("aa").to_frame()));
        assert_eq!(rx2.recv().await, Some(ok("bb").to_frame()));
    }

    #[tokio::test]
    async fn sends_to_dead_connections_are_absorbed() {
        let registry = ConnectionRegistry::new();

        // Unknown connection.
        registry.send_ok(ConnId(9), &ok("aa"));

        // Receiver dropped.
        drop(registry.register(ConnId(1), 8));
        registry.send_ok(ConnId(1), &ok("aa"));

        // Queue full.
        let mut rx = registry.register(ConnId(2), 1);
        registry.send_ok(ConnId(2), &ok("aa"));
        registry.send_ok(ConnId(2), &ok("bb"));
        assert_eq!(rx.recv().await, Some(ok("aa").to_frame()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_closes_the_queue() {
        let registry = ConnectionRegistry::new();
        let mut rx = registry.register(ConnId(1), 8);

        assert!(registry.unregister(ConnId(1)));
        assert!(!registry.unregister(ConnId(1)));
        assert_eq!(rx.recv().await, None);
    }
}
