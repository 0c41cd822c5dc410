//! MCP Bridge Server
//!
//! Bidirectional Model Context Protocol (MCP) transport over HTTP: an SSE
//! push stream paired with an out-of-band JSON-RPC message relay.

use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mcp_bridge::config::{Args, Config, Manifest};
use mcp_bridge::error::Result;
use mcp_bridge::http::{self, AppState};
use mcp_bridge::metrics::Metrics;
use mcp_bridge::procedures;
use mcp_bridge::rpc::{JsonRpcRouter, ProcedureTable};
use mcp_bridge::sse::{ConnectionRegistry, MessageRelay};
use mcp_bridge::VERSION;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let manifest = match &args.manifest {
        Some(path) => {
            info!("Loading manifest from {:?}", path);
            Manifest::load(path)?
        }
        None => Manifest::default(),
    };

    let config: Config = args.into();

    info!("MCP Bridge Server v{}", VERSION);
    info!(
        "Heartbeat: {:?}, connection TTL: {:?}",
        config.heartbeat(),
        config.ttl()
    );

    // Register built-in procedures
    let mut table = ProcedureTable::new();
    procedures::register_builtin(&mut table, &manifest)?;
    info!("Registered {} procedures", table.len());

    // Wire up shared state
    let metrics = Metrics::new();
    let registry = ConnectionRegistry::new(Arc::clone(&metrics));
    let router = Arc::new(JsonRpcRouter::new(Arc::new(table)));
    let relay = Arc::new(MessageRelay::new(
        Arc::clone(&registry),
        Arc::clone(&router),
        config.ttl(),
    ));

    let state = AppState {
        registry,
        relay,
        router,
        metrics,
        config: config.clone(),
    };

    http::serve(&config, state).await
}
