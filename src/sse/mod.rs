//! Server-Sent-Events transport layer.
//!
//! - `frame` - wire-format encode/decode
//! - `registry` - connection identity, liveness, TTL sweeping
//! - `session` - per-connection stream lifecycle and heartbeat cadence
//! - `relay` - out-of-band message delivery into a session

pub mod frame;
pub mod registry;
pub mod relay;
pub mod session;

pub use frame::SseFrame;
pub use registry::{Connection, ConnectionRegistry, ConnectionState};
pub use relay::{DeliveryReceipt, MessageRelay};
pub use session::StreamSession;
