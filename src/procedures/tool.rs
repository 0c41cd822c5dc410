//! Tool procedure: executable capabilities with parameter schemas.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::rpc::procedure::{Params, Procedure};

/// Definition advertised by `tool.list`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// An executable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn execute(&self, args: Map<String, Value>) -> Result<Value>;
}

/// Procedure exposing `tool.list`, `tool.execute`, `tool.schema`.
#[derive(Default)]
pub struct ToolProcedure {
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolProcedure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.tools.insert(handler.definition().name, handler);
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    fn handler(&self, name: &str) -> Result<&Arc<dyn ToolHandler>> {
        self.tools
            .get(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))
    }

    fn list(&self) -> Result<Value> {
        let entries: Map<String, Value> = self
            .tools
            .iter()
            .map(|(name, handler)| {
                let def = handler.definition();
                (
                    name.clone(),
                    json!({
                        "name": def.name,
                        "description": def.description,
                        "schema": def.input_schema,
                    }),
                )
            })
            .collect();
        Ok(Value::Object(entries))
    }

    async fn execute(&self, params: &Params) -> Result<Value> {
        let name = params.str_arg("name", 0)?;
        let args = params.map_arg("params", 1);

        let handler = self.handler(&name)?;
        validate_against_schema(&args, &handler.definition().input_schema)?;
        handler.execute(args).await
    }

    fn schema(&self, params: &Params) -> Result<Value> {
        let name = params.str_arg("name", 0)?;
        Ok(self.handler(&name)?.definition().input_schema)
    }
}

#[async_trait]
impl Procedure for ToolProcedure {
    fn name(&self) -> &str {
        "tool"
    }

    async fn call(&self, method: &str, params: Params) -> Result<Value> {
        match method {
            "list" => self.list(),
            "execute" => self.execute(&params).await,
            "schema" => self.schema(&params),
            _ => Err(Error::MethodNotFound(method.to_string())),
        }
    }
}

/// Validate arguments against a minimal JSON-schema subset: `required`
/// keys must be present and declared primitive `type`s must match.
pub fn validate_against_schema(args: &Map<String, Value>, schema: &Value) -> Result<()> {
    let schema = match schema.as_object() {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(()),
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(key) {
                return Err(Error::InvalidParams(format!(
                    "Missing required argument: {}",
                    key
                )));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, value) in args {
            let declared = properties
                .get(key)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str);
            if let Some(ty) = declared {
                if !type_matches(value, ty) {
                    return Err(Error::InvalidParams(format!(
                        "Argument {} must be of type {}",
                        key, ty
                    )));
                }
            }
        }
    }

    Ok(())
}

fn type_matches(value: &Value, ty: &str) -> bool {
    match ty {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}
