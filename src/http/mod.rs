//! HTTP surface: SSE event stream, message relay, direct JSON-RPC, and
//! operational endpoints.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::rpc::JsonRpcRouter;
use crate::sse::{ConnectionRegistry, MessageRelay, StreamSession};

/// Header carrying the target connection id on relay requests.
pub const CONNECTION_ID_HEADER: &str = "x-mcp-connection-id";

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub relay: Arc<MessageRelay>,
    pub router: Arc<JsonRpcRouter>,
    pub metrics: Arc<Metrics>,
    pub config: Config,
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/mcp/sse", get(open_stream))
        .route("/mcp/message", post(relay_message))
        .route("/mcp/json-rpc", post(json_rpc))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listener, start the connection sweeper, and serve until the
/// process exits.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    spawn_sweeper(
        Arc::clone(&state.registry),
        config.sweep(),
        config.ttl(),
    );

    let app = app(state);
    let addr = config.listen_addr();
    info!("Starting MCP bridge on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically evict closed and expired connections.
fn spawn_sweeper(registry: Arc<ConnectionRegistry>, interval: Duration, ttl: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = registry.sweep(ttl);
            if evicted > 0 {
                debug!(evicted, "swept stale connections");
            }
        }
    });
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state
        .metrics
        .set_active_connections(state.registry.active_count() as u64);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}

/// Open an SSE stream. The first frame is the connection handshake
/// carrying the id the client must use on subsequent relay requests.
async fn open_stream(State(state): State<AppState>) -> Response {
    let session = StreamSession::open(Arc::clone(&state.registry), state.config.heartbeat());
    info!(connection_id = %session.connection_id(), "sse stream opened");

    let stream = session.into_stream().map(Ok::<_, Infallible>);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[derive(Debug, Deserialize)]
struct RelayQuery {
    connection_id: Option<String>,
}

/// Relay an out-of-band JSON-RPC message onto an open stream.
async fn relay_message(
    State(state): State<AppState>,
    Query(query): Query<RelayQuery>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let connection_id = headers
        .get(CONNECTION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .or(query.connection_id);

    let connection_id = match connection_id {
        Some(id) => id,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "Missing connection id",
                })),
            )
                .into_response();
        }
    };

    state.metrics.inc_rpc_requests();
    match state.relay.deliver(&connection_id, &body).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "connection_id": receipt.connection_id,
                "delivered": receipt.delivered,
            })),
        )
            .into_response(),
        Err(e) if e.is_connection_error() => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": e.to_string(),
                "connection_id": connection_id,
            })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Direct JSON-RPC endpoint for clients that do not hold a stream open.
/// Notifications and all-notification batches yield 204.
async fn json_rpc(State(state): State<AppState>, body: String) -> Response {
    state.metrics.inc_rpc_requests();
    match state.router.handle_raw(&body).await.into_json() {
        Some(value) => (StatusCode::OK, Json(value)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
