//! MCP Bridge - HTTP/SSE transport for the Model Context Protocol
//!
//! A bidirectional RPC bridge: clients hold a long-lived Server-Sent-Events
//! stream for server-to-client push while submitting JSON-RPC calls on
//! separate HTTP requests, correlated by connection id.
//!
//! # Architecture
//!
//! 1. **RPC Layer** (`rpc`) - JSON-RPC 2.0 envelopes, the procedure table,
//!    and the method router (`"procedure.method"` dispatch)
//! 2. **Procedures** (`procedures`) - built-in capability handlers for
//!    server metadata, resources, tools, and prompts
//! 3. **SSE Layer** (`sse`) - connection registry, stream sessions with
//!    heartbeat cadence, and the message relay
//! 4. **HTTP Layer** (`http`) - axum routes binding the above to endpoints
//!
//! The connection registry is the only mutable shared structure; procedure
//! registrations are frozen at startup.

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod procedures;
pub mod rpc;
pub mod sse;
pub mod tools;

pub use error::{Error, Result};

/// Server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP protocol revision advertised in `server.capabilities`.
pub const MCP_VERSION: &str = "2024-11-05";

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Default idle TTL for connections in seconds.
pub const DEFAULT_CONNECTION_TTL_SECS: u64 = 300;
