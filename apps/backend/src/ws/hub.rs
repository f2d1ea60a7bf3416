use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Something that can push an event down one client connection.
///
/// Delivery is fire-and-forget; a sink for a connection that already went
/// away silently drops the event.
pub trait ClientSink: Send + Sync {
    fn deliver(&self, msg: &ServerMsg);
}

/// Connections attached to this process.
#[derive(Default)]
pub struct WsRegistry {
    connections: DashMap<Uuid, Arc<dyn ClientSink>>,
}

impl WsRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    pub fn register_connection(&self, conn_id: Uuid, sink: Arc<dyn ClientSink>) {
        self.connections.insert(conn_id, sink);
    }

    pub fn unregister_connection(&self, conn_id: Uuid) {
        self.connections.remove(&conn_id);
    }

    pub fn active_connections_count(&self) -> usize {
        self.connections.len()
    }

    /// Deliver to every local connection. Never touches the shared bus.
    pub fn broadcast(&self, msg: &ServerMsg) {
        for entry in self.connections.iter() {
            entry.value().deliver(msg);
        }
    }
}

/// Sink that keeps every delivered event in memory.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<ServerMsg>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<ServerMsg> {
        self.messages.lock().clone()
    }

    pub fn take(&self) -> Vec<ServerMsg> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Poll until at least `count` events arrived or `timeout` elapsed.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let start = tokio::time::Instant::now();
        loop {
            if self.len() >= count {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl ClientSink for RecordingSink {
    fn deliver(&self, msg: &ServerMsg) {
        self.messages.lock().push(msg.clone());
    }
}
