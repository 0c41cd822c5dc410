//! Server procedure: identity, capabilities, ping, and client log routing.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::ServerIdentity;
use crate::error::{Error, Result};
use crate::rpc::procedure::{Params, Procedure};
use crate::MCP_VERSION;

use super::prompt::PromptProcedure;
use super::resource::ResourceProcedure;
use super::tool::ToolProcedure;

/// Procedure exposing `server.info`, `server.capabilities`, `server.ping`
/// and `server.log`.
pub struct ServerProcedure {
    identity: ServerIdentity,
    resources: Arc<ResourceProcedure>,
    tools: Arc<ToolProcedure>,
    prompts: Arc<PromptProcedure>,
}

impl ServerProcedure {
    pub fn new(
        identity: ServerIdentity,
        resources: Arc<ResourceProcedure>,
        tools: Arc<ToolProcedure>,
        prompts: Arc<PromptProcedure>,
    ) -> Self {
        Self {
            identity,
            resources,
            tools,
            prompts,
        }
    }

    fn info(&self) -> Value {
        json!({
            "name": self.identity.name,
            "version": self.identity.version,
            "resources": self.resources.names(),
            "tools": self.tools.names(),
            "prompts": self.prompts.names(),
        })
    }

    fn capabilities(&self) -> Value {
        json!({
            "protocol_version": MCP_VERSION,
            "capabilities": {
                "resources": { "list": true, "get": true },
                "tools": { "list": true, "execute": true },
                "prompts": { "list": true, "get": true },
                "logging": {},
            },
        })
    }

    fn ping(&self) -> Value {
        json!({
            "status": "ok",
            "timestamp": Utc::now().to_rfc3339(),
        })
    }

    /// Route a client-side log message into our own log stream. Unknown
    /// levels fall back to info.
    fn log(&self, params: &Params) -> Result<Value> {
        let level = params
            .opt_str_arg("level", 0)
            .unwrap_or_else(|| "info".to_string());
        let message = params.str_arg("message", 1)?;

        match level.as_str() {
            "debug" => debug!(source = "client", "{}", message),
            "warning" | "warn" => warn!(source = "client", "{}", message),
            "error" => error!(source = "client", "{}", message),
            _ => info!(source = "client", "{}", message),
        }
        Ok(Value::Bool(true))
    }
}

#[async_trait]
impl Procedure for ServerProcedure {
    fn name(&self) -> &str {
        "server"
    }

    async fn call(&self, method: &str, params: Params) -> Result<Value> {
        match method {
            "info" => Ok(self.info()),
            "capabilities" => Ok(self.capabilities()),
            "ping" => Ok(self.ping()),
            "log" => self.log(&params),
            _ => Err(Error::MethodNotFound(method.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn procedure() -> ServerProcedure {
        ServerProcedure::new(
            ServerIdentity::default(),
            Arc::new(ResourceProcedure::new()),
            Arc::new(ToolProcedure::new()),
            Arc::new(PromptProcedure::new()),
        )
    }

    #[tokio::test]
    async fn test_ping() {
        let result = procedure().call("ping", Params::default()).await.unwrap();
        assert_eq!(result["status"], "ok");
        assert!(result["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_info_lists_registrations() {
        let result = procedure().call("info", Params::default()).await.unwrap();
        assert_eq!(result["version"], crate::VERSION);
        assert!(result["resources"].is_array());
        assert!(result["tools"].is_array());
        assert!(result["prompts"].is_array());
    }

    #[tokio::test]
    async fn test_capabilities() {
        let result = procedure()
            .call("capabilities", Params::default())
            .await
            .unwrap();
        assert_eq!(result["protocol_version"], MCP_VERSION);
        assert_eq!(result["capabilities"]["tools"]["execute"], true);
    }

    #[tokio::test]
    async fn test_log_requires_message() {
        let err = procedure()
            .call("log", Params::new(Some(json!({"level": "warn"}))))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_log_unknown_level_accepted() {
        let result = procedure()
            .call(
                "log",
                Params::new(Some(json!({"level": "shout", "message": "hi"}))),
            )
            .await
            .unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let err = procedure()
            .call("restart", Params::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MethodNotFound(_)));
    }
}
