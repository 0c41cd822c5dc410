//! Resource procedure: read-oriented data exposed to clients.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::rpc::procedure::{Params, Procedure};

/// A registered resource backend. Whatever a handler does internally is
/// opaque to the procedure layer; it only promises metadata and reads.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn metadata(&self) -> Value;

    fn schema(&self) -> Option<Value> {
        None
    }

    async fn read(&self, params: Map<String, Value>) -> Result<Value>;
}

/// A resource serving fixed data, typically registered from the manifest.
pub struct StaticResource {
    name: String,
    description: Option<String>,
    data: Value,
}

impl StaticResource {
    pub fn new(name: impl Into<String>, description: Option<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            description,
            data,
        }
    }
}

#[async_trait]
impl ResourceHandler for StaticResource {
    fn metadata(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "static": true,
        })
    }

    async fn read(&self, _params: Map<String, Value>) -> Result<Value> {
        Ok(self.data.clone())
    }
}

/// Procedure exposing `resource.list`, `resource.get`, `resource.schema`.
#[derive(Default)]
pub struct ResourceProcedure {
    resources: BTreeMap<String, Arc<dyn ResourceHandler>>,
}

impl ResourceProcedure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ResourceHandler>) {
        self.resources.insert(name.into(), handler);
    }

    pub fn names(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }

    fn handler(&self, name: &str) -> Result<&Arc<dyn ResourceHandler>> {
        self.resources
            .get(name)
            .ok_or_else(|| Error::ResourceNotFound(name.to_string()))
    }

    fn list(&self) -> Value {
        let entries: Map<String, Value> = self
            .resources
            .iter()
            .map(|(name, handler)| (name.clone(), handler.metadata()))
            .collect();
        Value::Object(entries)
    }

    async fn get(&self, params: &Params) -> Result<Value> {
        // Some clients send the target as "resource" rather than "name".
        let name = params
            .opt_str_arg("name", 0)
            .or_else(|| params.opt_str_arg("resource", 0))
            .ok_or_else(|| Error::InvalidParams("Missing required argument: name".to_string()))?;
        let query = params.map_arg("params", 1);
        self.handler(&name)?.read(query).await
    }

    fn schema(&self, params: &Params) -> Result<Value> {
        let name = params.str_arg("name", 0)?;
        Ok(self.handler(&name)?.schema().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Procedure for ResourceProcedure {
    fn name(&self) -> &str {
        "resource"
    }

    async fn call(&self, method: &str, params: Params) -> Result<Value> {
        match method {
            "list" => Ok(self.list()),
            "get" => self.get(&params).await,
            "schema" => self.schema(&params),
            _ => Err(Error::MethodNotFound(method.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn procedure() -> ResourceProcedure {
        let mut procedure = ResourceProcedure::new();
        procedure.register(
            "users",
            Arc::new(StaticResource::new(
                "users",
                Some("Sample users".to_string()),
                json!([{"id": 1, "name": "Ada"}]),
            )),
        );
        procedure
    }

    #[tokio::test]
    async fn test_list_includes_metadata() {
        let result = procedure().call("list", Params::default()).await.unwrap();
        assert_eq!(result["users"]["name"], "users");
        assert_eq!(result["users"]["static"], true);
    }

    #[tokio::test]
    async fn test_get_by_name_key() {
        let params = Params::new(Some(json!({"name": "users"})));
        let result = procedure().call("get", params).await.unwrap();
        assert_eq!(result[0]["name"], "Ada");
    }

    #[tokio::test]
    async fn test_get_accepts_resource_key() {
        let params = Params::new(Some(json!({"resource": "users"})));
        let result = procedure().call("get", params).await.unwrap();
        assert_eq!(result[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_get_positional() {
        let params = Params::new(Some(json!(["users"])));
        assert!(procedure().call("get", params).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_unknown_resource() {
        let params = Params::new(Some(json!({"name": "missing"})));
        let err = procedure().call("get", params).await.unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_schema_defaults_to_null() {
        let params = Params::new(Some(json!({"name": "users"})));
        let result = procedure().call("schema", params).await.unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let err = procedure()
            .call("destroy", Params::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MethodNotFound(_)));
    }
}
