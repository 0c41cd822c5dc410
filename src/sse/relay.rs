//! Message relay: out-of-band client-to-server delivery.
//!
//! A relayed message arrives on its own HTTP request, tagged with the
//! connection id of the stream that should receive the results. Dispatch
//! runs here, on the relay's task; the stream session only ever sees the
//! finished response frames in its outbound queue.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::rpc::router::JsonRpcRouter;
use crate::sse::frame::SseFrame;
use crate::sse::registry::{ConnectionRegistry, ConnectionState};

/// Acknowledgment returned to the HTTP caller. Independent of whether the
/// responses have reached the wire yet; they arrive asynchronously over
/// the stream.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReceipt {
    pub connection_id: String,
    /// Number of response frames enqueued (notifications produce none).
    pub delivered: usize,
}

/// Bridges relayed messages into the owning stream session.
pub struct MessageRelay {
    registry: Arc<ConnectionRegistry>,
    router: Arc<JsonRpcRouter>,
    ttl: Duration,
}

impl MessageRelay {
    pub fn new(registry: Arc<ConnectionRegistry>, router: Arc<JsonRpcRouter>, ttl: Duration) -> Self {
        Self {
            registry,
            router,
            ttl,
        }
    }

    /// Deliver a raw JSON-RPC payload to the session owning `connection_id`.
    ///
    /// Protocol-level failures (parse errors, unknown methods, handler
    /// errors) are folded into JSON-RPC error responses and pushed over
    /// the stream like any result; only a missing or expired connection
    /// surfaces here as an error.
    pub async fn deliver(&self, connection_id: &str, raw: &str) -> Result<DeliveryReceipt> {
        let connection = self
            .registry
            .get(connection_id)
            .ok_or_else(|| Error::ConnectionNotFound(connection_id.to_string()))?;

        if connection.state == ConnectionState::Closed {
            return Err(Error::ConnectionNotFound(connection_id.to_string()));
        }
        if connection.idle_for() >= self.ttl {
            self.registry.close(connection_id);
            return Err(Error::ConnectionExpired(connection_id.to_string()));
        }

        self.registry.touch(connection_id);
        self.registry.metrics().inc_messages_relayed();
        debug!(connection_id, bytes = raw.len(), "relaying message");

        let responses = self.router.handle_raw(raw).await.responses();
        let delivered = responses.len();

        for response in responses {
            let value = serde_json::to_value(&response)?;
            if let Err(e) = self.registry.send(connection_id, SseFrame::json("message", &value)) {
                // The peer is assumed gone; close and stop, no retries.
                warn!(connection_id, error = %e, "push failed, closing connection");
                self.registry.close(connection_id);
                break;
            }
        }

        Ok(DeliveryReceipt {
            connection_id: connection_id.to_string(),
            delivered,
        })
    }
}
