//! Connection identity and liveness tracking.
//!
//! The registry is the single source of truth for streaming connections
//! and the only mutable structure shared between the stream-opening path,
//! each session's heartbeat loop, and the message relay. Entries live in a
//! concurrent map; per-entry mutation is serialized by the map shards.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::sse::frame::SseFrame;

/// Capacity of each session's outbound event queue.
const OUTBOUND_QUEUE_SIZE: usize = 64;

/// Liveness state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created but no frame written yet.
    Pending,
    /// Stream is live; frames flow.
    Active,
    /// Terminal. A closed connection is never reused.
    Closed,
}

/// The logical identity of one open streaming session.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: String,
    pub created_at: Instant,
    pub last_active: Instant,
    pub state: ConnectionState,
    pub heartbeat_interval: Duration,
}

impl Connection {
    /// Time since the last inbound or outbound activity.
    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }
}

struct Entry {
    connection: Connection,
    sender: Option<mpsc::Sender<SseFrame>>,
}

/// Registry of live streaming connections keyed by connection id.
pub struct ConnectionRegistry {
    connections: DashMap<String, Entry>,
    metrics: Arc<Metrics>,
}

impl ConnectionRegistry {
    pub fn new(metrics: Arc<Metrics>) -> Arc<Self> {
        Arc::new(Self {
            connections: DashMap::new(),
            metrics,
        })
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Allocate a new connection in the `Pending` state.
    pub fn create(&self, heartbeat_interval: Duration) -> Connection {
        let now = Instant::now();
        let connection = Connection {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            last_active: now,
            state: ConnectionState::Pending,
            heartbeat_interval,
        };
        self.connections.insert(
            connection.id.clone(),
            Entry {
                connection: connection.clone(),
                sender: None,
            },
        );
        self.metrics.inc_connections_opened();
        debug!(connection_id = %connection.id, "connection created");
        connection
    }

    /// Attach the outbound queue for a connection's session.
    ///
    /// At most one session exists per id; attaching replaces any earlier
    /// sender, which ends the previous session's stream.
    pub fn attach(&self, id: &str, sender: mpsc::Sender<SseFrame>) -> Result<()> {
        let mut entry = self
            .connections
            .get_mut(id)
            .ok_or_else(|| Error::ConnectionNotFound(id.to_string()))?;
        if entry.sender.replace(sender).is_some() {
            warn!(connection_id = %id, "replaced existing session sender");
        }
        Ok(())
    }

    /// Transition `Pending -> Active` on the first frame write.
    pub fn activate(&self, id: &str) -> Result<()> {
        let mut entry = self
            .connections
            .get_mut(id)
            .ok_or_else(|| Error::ConnectionNotFound(id.to_string()))?;
        if entry.connection.state == ConnectionState::Pending {
            entry.connection.state = ConnectionState::Active;
        }
        entry.connection.last_active = Instant::now();
        Ok(())
    }

    /// Record activity on a connection.
    pub fn touch(&self, id: &str) {
        if let Some(mut entry) = self.connections.get_mut(id) {
            entry.connection.last_active = Instant::now();
        }
    }

    pub fn get(&self, id: &str) -> Option<Connection> {
        self.connections.get(id).map(|e| e.connection.clone())
    }

    /// Enqueue a frame on a connection's outbound queue.
    ///
    /// Fails with [`Error::Transport`] when the session is closed or the
    /// queue is gone; callers treat that as an implicit disconnect.
    pub fn send(&self, id: &str, frame: SseFrame) -> Result<()> {
        let entry = self
            .connections
            .get(id)
            .ok_or_else(|| Error::ConnectionNotFound(id.to_string()))?;
        let sender = entry
            .sender
            .as_ref()
            .ok_or_else(|| Error::Transport(format!("no live session for {}", id)))?;
        sender
            .try_send(frame)
            .map_err(|e| Error::Transport(format!("send to {} failed: {}", id, e)))
    }

    /// Close a connection. Idempotent: closing twice is a no-op.
    ///
    /// Dropping the sender ends the session's event loop, which emits a
    /// terminal frame and finishes the stream.
    pub fn close(&self, id: &str) -> bool {
        if let Some(mut entry) = self.connections.get_mut(id) {
            if entry.connection.state != ConnectionState::Closed {
                entry.connection.state = ConnectionState::Closed;
                entry.sender = None;
                self.metrics.inc_connections_closed();
                info!(connection_id = %id, "connection closed");
                return true;
            }
        }
        false
    }

    /// Force-close and evict connections idle past `ttl`, along with
    /// tombstones of already-closed connections. Returns the eviction count.
    pub fn sweep(&self, ttl: Duration) -> usize {
        let stale: Vec<String> = self
            .connections
            .iter()
            .filter(|e| {
                e.connection.state == ConnectionState::Closed || e.connection.idle_for() >= ttl
            })
            .map(|e| e.connection.id.clone())
            .collect();

        let mut evicted = 0;
        for id in stale {
            self.close(&id);
            if self.connections.remove(&id).is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            self.metrics.add_connections_swept(evicted as u64);
            info!(evicted, "registry sweep reclaimed connections");
        }
        evicted
    }

    /// Number of connections not yet closed.
    pub fn active_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|e| e.connection.state != ConnectionState::Closed)
            .count()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<ConnectionRegistry> {
        ConnectionRegistry::new(Metrics::new())
    }

    #[test]
    fn test_create_starts_pending() {
        let registry = registry();
        let connection = registry.create(Duration::from_secs(30));
        assert_eq!(connection.state, ConnectionState::Pending);
        assert!(!connection.id.is_empty());
        assert_eq!(registry.get(&connection.id).unwrap().state, ConnectionState::Pending);
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = registry();
        let a = registry.create(Duration::from_secs(30));
        let b = registry.create(Duration::from_secs(30));
        assert_ne!(a.id, b.id);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_activate_transitions_to_active() {
        let registry = registry();
        let connection = registry.create(Duration::from_secs(30));
        registry.activate(&connection.id).unwrap();
        assert_eq!(registry.get(&connection.id).unwrap().state, ConnectionState::Active);
    }

    #[test]
    fn test_activate_unknown_fails() {
        assert!(matches!(
            registry().activate("does-not-exist"),
            Err(Error::ConnectionNotFound(_))
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let registry = registry();
        let connection = registry.create(Duration::from_secs(30));
        assert!(registry.close(&connection.id));
        assert!(!registry.close(&connection.id));
        assert_eq!(registry.get(&connection.id).unwrap().state, ConnectionState::Closed);
    }

    #[test]
    fn test_send_without_session_is_transport_error() {
        let registry = registry();
        let connection = registry.create(Duration::from_secs(30));
        let err = registry.send(&connection.id, SseFrame::data("x")).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_send_reaches_attached_queue() {
        let registry = registry();
        let connection = registry.create(Duration::from_secs(30));
        let (tx, mut rx) = mpsc::channel(4);
        registry.attach(&connection.id, tx).unwrap();

        registry.send(&connection.id, SseFrame::data("hello")).unwrap();
        assert_eq!(rx.recv().await.unwrap().data, "hello");
    }

    #[tokio::test]
    async fn test_close_drops_sender() {
        let registry = registry();
        let connection = registry.create(Duration::from_secs(30));
        let (tx, mut rx) = mpsc::channel(4);
        registry.attach(&connection.id, tx).unwrap();

        registry.close(&connection.id);
        assert!(rx.recv().await.is_none());
        assert!(registry.send(&connection.id, SseFrame::data("x")).is_err());
    }

    #[test]
    fn test_sweep_evicts_idle_connections() {
        let registry = registry();
        let connection = registry.create(Duration::from_secs(30));

        let evicted = registry.sweep(Duration::ZERO);
        assert_eq!(evicted, 1);
        assert!(registry.get(&connection.id).is_none());
    }

    #[test]
    fn test_sweep_spares_recent_activity() {
        let registry = registry();
        let connection = registry.create(Duration::from_secs(30));
        registry.touch(&connection.id);

        let evicted = registry.sweep(Duration::from_secs(60));
        assert_eq!(evicted, 0);
        assert!(registry.get(&connection.id).is_some());
    }

    #[test]
    fn test_sweep_evicts_closed_tombstones() {
        let registry = registry();
        let connection = registry.create(Duration::from_secs(30));
        registry.close(&connection.id);

        registry.sweep(Duration::from_secs(3600));
        assert!(registry.get(&connection.id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_active_count_excludes_closed() {
        let registry = registry();
        let a = registry.create(Duration::from_secs(30));
        let _b = registry.create(Duration::from_secs(30));
        registry.close(&a.id);
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.len(), 2);
    }
}
