//! Built-in tool implementations.

pub mod http;

pub use http::HttpTool;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::procedures::tool::{ToolDefinition, ToolHandler, ToolProcedure};

/// Register all built-in tools.
pub fn register_all(procedure: &mut ToolProcedure) {
    procedure.register(Arc::new(EchoTool));
    procedure.register(Arc::new(HttpTool::new()));
}

/// Returns its input unchanged. Mainly useful for connectivity checks.
pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "echo".to_string(),
            description: "Echo the given message back to the caller".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string" },
                },
                "required": ["message"],
            }),
        }
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        let message = args
            .get("message")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidParams("Missing required argument: message".to_string()))?;
        Ok(json!({ "message": message }))
    }
}
