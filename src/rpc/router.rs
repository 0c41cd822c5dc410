//! JSON-RPC method router.
//!
//! Turns raw request bodies into response envelopes: parse, validate,
//! resolve `"procedure.method"`, invoke, and fold results or failures back
//! into JSON-RPC responses. Handler errors never escape this boundary.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::rpc::procedure::{Params, ProcedureTable};
use crate::rpc::protocol::{error_codes, JsonRpcRequest, JsonRpcResponse, RequestId, JSONRPC_VERSION};

/// Outcome of routing one raw payload.
#[derive(Debug)]
pub enum RpcOutcome {
    /// Input was a notification (or a batch of only notifications).
    None,
    /// Single request, single response.
    Single(JsonRpcResponse),
    /// Batch request; responses in input order, notifications excluded.
    Batch(Vec<JsonRpcResponse>),
}

impl RpcOutcome {
    /// Serialize to a JSON value, `None` when nothing should be sent back.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Single(response) => serde_json::to_value(response).ok(),
            Self::Batch(responses) => {
                if responses.is_empty() {
                    None
                } else {
                    serde_json::to_value(responses).ok()
                }
            }
        }
    }

    /// Individual responses, for pushing over a stream.
    pub fn responses(self) -> Vec<JsonRpcResponse> {
        match self {
            Self::None => Vec::new(),
            Self::Single(response) => vec![response],
            Self::Batch(responses) => responses,
        }
    }
}

/// Routes validated JSON-RPC requests to registered procedures.
pub struct JsonRpcRouter {
    table: Arc<ProcedureTable>,
}

impl JsonRpcRouter {
    pub fn new(table: Arc<ProcedureTable>) -> Self {
        Self { table }
    }

    /// Handle a raw request body: single request or batch array.
    pub async fn handle_raw(&self, raw: &str) -> RpcOutcome {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "rejecting unparseable request body");
                return RpcOutcome::Single(JsonRpcResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return RpcOutcome::Single(JsonRpcResponse::error(
                        None,
                        error_codes::INVALID_REQUEST,
                        "Invalid Request: empty batch",
                    ));
                }
                RpcOutcome::Batch(self.dispatch_batch(items).await)
            }
            other => match Self::validate_envelope(other) {
                Ok(request) => {
                    let notification = request.is_notification();
                    let response = self.dispatch(request).await;
                    if notification {
                        RpcOutcome::None
                    } else {
                        RpcOutcome::Single(response)
                    }
                }
                Err(response) => RpcOutcome::Single(response),
            },
        }
    }

    /// Dispatch a batch: each entry is processed independently, responses
    /// preserve input order, and notifications contribute no entry.
    pub async fn dispatch_batch(&self, items: Vec<Value>) -> Vec<JsonRpcResponse> {
        let mut responses = Vec::with_capacity(items.len());
        for item in items {
            match Self::validate_envelope(item) {
                Ok(request) => {
                    let notification = request.is_notification();
                    let response = self.dispatch(request).await;
                    if !notification {
                        responses.push(response);
                    }
                }
                Err(response) => responses.push(response),
            }
        }
        responses
    }

    /// Dispatch a validated request to its procedure handler.
    ///
    /// The response id always equals the request id.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        debug!(method = %request.method, id = ?id, "dispatching request");

        match self.invoke(&request).await {
            Ok(result) => JsonRpcResponse::result(id, result),
            Err(e) => {
                let code = e.rpc_error_code();
                let message = match code {
                    error_codes::SERVER_ERROR => format!("Server error: {}", e),
                    _ => e.to_string(),
                };
                warn!(method = %request.method, code, error = %e, "request failed");
                JsonRpcResponse::error(id, code, message)
            }
        }
    }

    async fn invoke(&self, request: &JsonRpcRequest) -> Result<Value> {
        let (procedure_name, method_name) = split_method(&request.method)?;

        let procedure = self
            .table
            .resolve(procedure_name)
            .ok_or_else(|| Error::MethodNotFound(format!("Procedure not found: {}", procedure_name)))?;

        procedure
            .call(method_name, Params::new(request.params.clone()))
            .await
    }

    /// Validate a JSON-RPC 2.0 envelope, recovering the id where possible
    /// so the error response can echo it.
    fn validate_envelope(value: Value) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
        let obj = match value.as_object() {
            Some(obj) => obj,
            None => {
                return Err(JsonRpcResponse::error(
                    None,
                    error_codes::INVALID_REQUEST,
                    "Invalid Request: not an object",
                ))
            }
        };

        let id = recover_id(obj.get("id"));

        if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(JsonRpcResponse::error(
                id,
                error_codes::INVALID_REQUEST,
                "Invalid Request: missing jsonrpc \"2.0\"",
            ));
        }

        let method = match obj.get("method").and_then(Value::as_str) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => {
                return Err(JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_REQUEST,
                    "Invalid Request: missing or non-string method",
                ))
            }
        };

        let params = match obj.get("params") {
            None | Some(Value::Null) => None,
            Some(p @ Value::Object(_)) | Some(p @ Value::Array(_)) => Some(p.clone()),
            Some(_) => {
                return Err(JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_REQUEST,
                    "Invalid Request: params must be an object or array",
                ))
            }
        };

        match obj.get("id") {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(Value::Number(n)) if n.is_i64() => {}
            Some(_) => {
                return Err(JsonRpcResponse::error(
                    None,
                    error_codes::INVALID_REQUEST,
                    "Invalid Request: id must be a string, integer, or null",
                ))
            }
        }

        Ok(JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method,
            params,
            id,
        })
    }
}

/// Split a `"procedure.method"` string on the first dot.
fn split_method(method: &str) -> Result<(&str, &str)> {
    match method.split_once('.') {
        Some((procedure, name)) if !procedure.is_empty() && !name.is_empty() => {
            Ok((procedure, name))
        }
        _ => Err(Error::InvalidRequest(format!(
            "Invalid method format: {}",
            method
        ))),
    }
}

fn recover_id(value: Option<&Value>) -> Option<RequestId> {
    match value {
        Some(Value::String(s)) => Some(RequestId::String(s.clone())),
        Some(Value::Number(n)) => n.as_i64().map(RequestId::Number),
        _ => None,
    }
}
