//! Stream session lifecycle.
//!
//! One `StreamSession` owns one streaming connection: it emits the
//! handshake frame, drains the outbound queue, keeps the heartbeat
//! cadence, and deregisters when the client goes away. The session never
//! blocks on application logic; relayed dispatch runs on the relay's own
//! task and only enqueues results here.

use chrono::Utc;
use futures::Stream;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::sse::frame::SseFrame;
use crate::sse::registry::ConnectionRegistry;

/// A live streaming session bound to one registry connection.
pub struct StreamSession {
    id: String,
    registry: Arc<ConnectionRegistry>,
    events: mpsc::Receiver<SseFrame>,
    heartbeat: Duration,
}

impl StreamSession {
    /// Register a new connection and bind a session to it.
    pub fn open(registry: Arc<ConnectionRegistry>, heartbeat: Duration) -> Self {
        let connection = registry.create(heartbeat);
        let (tx, rx) = mpsc::channel(64);
        // The entry was just created, so attach cannot miss.
        if let Err(e) = registry.attach(&connection.id, tx) {
            warn!(connection_id = %connection.id, error = %e, "failed to attach session");
        }
        Self {
            id: connection.id,
            registry,
            events: rx,
            heartbeat,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.id
    }

    /// Turn the session into a stream of encoded SSE frames.
    ///
    /// The first item is the handshake (`event: connected`) carrying the
    /// connection id; after that the loop interleaves queued data frames
    /// with comment-line heartbeats. Ticks with intervening traffic emit
    /// nothing. When the outbound queue closes (explicit close or sweep)
    /// a terminal `event: close` frame is emitted and the stream ends.
    ///
    /// Dropping the stream (client disconnect) closes the connection via
    /// the guard held in the loop state.
    pub fn into_stream(self) -> impl Stream<Item = String> + Send {
        let Self {
            id,
            registry,
            events,
            heartbeat,
        } = self;

        let mut ticker = interval_at(Instant::now() + heartbeat, heartbeat);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let state = SessionLoop {
            guard: SessionGuard {
                id,
                registry: registry.clone(),
            },
            registry,
            events,
            ticker,
            traffic: false,
            phase: Phase::Handshake,
        };

        futures::stream::unfold(state, |mut s| async move {
            loop {
                match s.phase {
                    Phase::Handshake => {
                        s.phase = Phase::Running;
                        if let Err(e) = s.registry.activate(&s.guard.id) {
                            warn!(connection_id = %s.guard.id, error = %e, "activation failed");
                        }
                        let payload = json!({
                            "type": "connection",
                            "connection_id": s.guard.id,
                            "timestamp": Utc::now().timestamp(),
                        });
                        return Some((SseFrame::json("connected", &payload).encode(), s));
                    }
                    Phase::Running => {
                        tokio::select! {
                            _ = s.ticker.tick() => {
                                if s.traffic {
                                    // Traffic since the last tick keeps the
                                    // connection visibly alive already.
                                    s.traffic = false;
                                    continue;
                                }
                                s.registry.metrics().inc_heartbeats();
                                return Some((SseFrame::comment("heartbeat"), s));
                            }
                            event = s.events.recv() => match event {
                                Some(frame) => {
                                    s.traffic = true;
                                    s.registry.touch(&s.guard.id);
                                    s.registry.metrics().inc_frames_sent();
                                    return Some((frame.encode(), s));
                                }
                                None => {
                                    s.phase = Phase::Done;
                                    debug!(connection_id = %s.guard.id, "outbound queue closed");
                                    let payload = json!({
                                        "type": "close",
                                        "connection_id": s.guard.id,
                                        "timestamp": Utc::now().timestamp(),
                                    });
                                    return Some((SseFrame::json("close", &payload).encode(), s));
                                }
                            }
                        }
                    }
                    Phase::Done => return None,
                }
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Handshake,
    Running,
    Done,
}

struct SessionLoop {
    guard: SessionGuard,
    registry: Arc<ConnectionRegistry>,
    events: mpsc::Receiver<SseFrame>,
    ticker: Interval,
    traffic: bool,
    phase: Phase,
}

/// Deregisters the connection when the stream is dropped, which is how a
/// client disconnect surfaces once axum abandons the response body.
struct SessionGuard {
    id: String,
    registry: Arc<ConnectionRegistry>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.registry.close(&self.id) {
            debug!(connection_id = %self.id, "session dropped, connection deregistered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use crate::sse::registry::ConnectionState;
    use tokio_stream::StreamExt;

    fn registry() -> Arc<ConnectionRegistry> {
        ConnectionRegistry::new(Metrics::new())
    }

    #[tokio::test]
    async fn test_handshake_carries_connection_id() {
        let registry = registry();
        let session = StreamSession::open(registry.clone(), Duration::from_secs(30));
        let id = session.connection_id().to_string();

        let mut stream = Box::pin(session.into_stream());
        let first = stream.next().await.unwrap();
        let frame = SseFrame::parse(&first).unwrap();

        assert_eq!(frame.event.as_deref(), Some("connected"));
        let payload: serde_json::Value = serde_json::from_str(&frame.data).unwrap();
        assert_eq!(payload["connection_id"], id.as_str());

        assert_eq!(registry.get(&id).unwrap().state, ConnectionState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_stream_emits_heartbeat_comment() {
        let registry = registry();
        let session = StreamSession::open(registry.clone(), Duration::from_millis(100));

        let mut stream = Box::pin(session.into_stream());
        let _handshake = stream.next().await.unwrap();

        let second = stream.next().await.unwrap();
        assert_eq!(second, ": heartbeat\n\n");
        // A comment frame is invisible to frame-level consumers.
        assert!(SseFrame::parse(&second).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_traffic_suppresses_heartbeat() {
        let registry = registry();
        let session = StreamSession::open(registry.clone(), Duration::from_millis(100));
        let id = session.connection_id().to_string();

        let mut stream = Box::pin(session.into_stream());
        let _handshake = stream.next().await.unwrap();

        registry.send(&id, SseFrame::event("message", "payload")).unwrap();
        let frame = SseFrame::parse(&stream.next().await.unwrap()).unwrap();
        assert_eq!(frame.event.as_deref(), Some("message"));

        // The tick after traffic stays silent; the one after that beats.
        let next = stream.next().await.unwrap();
        assert_eq!(next, ": heartbeat\n\n");
    }

    #[tokio::test]
    async fn test_close_emits_terminal_frame_and_ends_stream() {
        let registry = registry();
        let session = StreamSession::open(registry.clone(), Duration::from_secs(30));
        let id = session.connection_id().to_string();

        let mut stream = Box::pin(session.into_stream());
        let _handshake = stream.next().await.unwrap();

        registry.close(&id);
        let last = stream.next().await.unwrap();
        let frame = SseFrame::parse(&last).unwrap();
        assert_eq!(frame.event.as_deref(), Some("close"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_stream_deregisters_connection() {
        let registry = registry();
        let session = StreamSession::open(registry.clone(), Duration::from_secs(30));
        let id = session.connection_id().to_string();

        let mut stream = Box::pin(session.into_stream());
        let _handshake = stream.next().await.unwrap();
        drop(stream);

        assert_eq!(registry.get(&id).unwrap().state, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_queued_frames_preserve_send_order() {
        let registry = registry();
        let session = StreamSession::open(registry.clone(), Duration::from_secs(30));
        let id = session.connection_id().to_string();

        for n in 0..3 {
            registry
                .send(&id, SseFrame::event("message", format!("m{}", n)))
                .unwrap();
        }

        let mut stream = Box::pin(session.into_stream());
        let _handshake = stream.next().await.unwrap();
        for n in 0..3 {
            let frame = SseFrame::parse(&stream.next().await.unwrap()).unwrap();
            assert_eq!(frame.data, format!("m{}", n));
        }
    }
}
