//! Prometheus metrics for monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics collector.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Connections opened since startup
    pub connections_opened: AtomicU64,
    /// Connections closed (explicit, disconnect, or sweep)
    pub connections_closed: AtomicU64,
    /// Connections reclaimed by the TTL sweeper
    pub connections_swept: AtomicU64,
    /// Messages accepted by the relay endpoint
    pub messages_relayed: AtomicU64,
    /// Data frames written to streams
    pub frames_sent: AtomicU64,
    /// Heartbeat comment frames written
    pub heartbeats_sent: AtomicU64,
    /// JSON-RPC requests handled on the synchronous endpoint
    pub rpc_requests: AtomicU64,
    /// Currently active (non-closed) connections
    pub active_connections: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_connections_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_connections_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_connections_swept(&self, count: u64) {
        self.connections_swept.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_messages_relayed(&self) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_frames_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_heartbeats(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rpc_requests(&self) {
        self.rpc_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_active_connections(&self, count: u64) {
        self.active_connections.store(count, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            connections_swept: self.connections_swept.load(Ordering::Relaxed),
            messages_relayed: self.messages_relayed.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            rpc_requests: self.rpc_requests.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"# HELP mcp_bridge_connections_opened Connections opened since startup
# TYPE mcp_bridge_connections_opened counter
mcp_bridge_connections_opened {}

# HELP mcp_bridge_connections_closed Connections closed
# TYPE mcp_bridge_connections_closed counter
mcp_bridge_connections_closed {}

# HELP mcp_bridge_connections_swept Connections reclaimed by the TTL sweeper
# TYPE mcp_bridge_connections_swept counter
mcp_bridge_connections_swept {}

# HELP mcp_bridge_messages_relayed Messages accepted by the relay endpoint
# TYPE mcp_bridge_messages_relayed counter
mcp_bridge_messages_relayed {}

# HELP mcp_bridge_frames_sent Data frames written to streams
# TYPE mcp_bridge_frames_sent counter
mcp_bridge_frames_sent {}

# HELP mcp_bridge_heartbeats_sent Heartbeat comment frames written
# TYPE mcp_bridge_heartbeats_sent counter
mcp_bridge_heartbeats_sent {}

# HELP mcp_bridge_rpc_requests JSON-RPC requests on the synchronous endpoint
# TYPE mcp_bridge_rpc_requests counter
mcp_bridge_rpc_requests {}

# HELP mcp_bridge_active_connections Currently active connections
# TYPE mcp_bridge_active_connections gauge
mcp_bridge_active_connections {}
"#,
            s.connections_opened,
            s.connections_closed,
            s.connections_swept,
            s.messages_relayed,
            s.frames_sent,
            s.heartbeats_sent,
            s.rpc_requests,
            s.active_connections
        )
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub connections_swept: u64,
    pub messages_relayed: u64,
    pub frames_sent: u64,
    pub heartbeats_sent: u64,
    pub rpc_requests: u64,
    pub active_connections: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.inc_connections_opened();
        metrics.inc_connections_opened();
        metrics.inc_messages_relayed();
        metrics.set_active_connections(2);

        let s = metrics.snapshot();
        assert_eq!(s.connections_opened, 2);
        assert_eq!(s.messages_relayed, 1);
        assert_eq!(s.active_connections, 2);
        assert_eq!(s.heartbeats_sent, 0);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.inc_heartbeats();

        let text = metrics.to_prometheus();
        assert!(text.contains("mcp_bridge_heartbeats_sent 1"));
        assert!(text.contains("# TYPE mcp_bridge_active_connections gauge"));
    }
}
