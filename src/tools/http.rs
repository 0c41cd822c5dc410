//! HTTP request tool backed by a shared reqwest client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::procedures::tool::{ToolDefinition, ToolHandler};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Performs an outbound HTTP request and reports status and body.
pub struct HttpTool {
    client: Client,
}

impl HttpTool {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for HttpTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "http".to_string(),
            description: "Perform an HTTP request and return status and body".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string" },
                    "method": { "type": "string" },
                    "headers": { "type": "object" },
                    "body": { "type": "string" },
                },
                "required": ["url"],
            }),
        }
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        let url = args
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidParams("Missing required argument: url".to_string()))?;
        let method = args
            .get("method")
            .and_then(|v| v.as_str())
            .unwrap_or("GET")
            .to_uppercase();
        let method: reqwest::Method = method
            .parse()
            .map_err(|_| Error::InvalidParams(format!("Unsupported HTTP method: {}", method)))?;

        debug!(%method, url, "executing http tool request");

        let mut request = self.client.request(method, url);
        if let Some(headers) = args.get("headers").and_then(|v| v.as_object()) {
            for (key, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(key, value);
                }
            }
        }
        if let Some(body) = args.get("body").and_then(|v| v.as_str()) {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let json_body = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);
        let text = response.text().await?;

        let body = if json_body {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };

        Ok(json!({ "status": status, "body": body }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_url() {
        let err = HttpTool::new().execute(Map::new()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_invalid_method() {
        let args = json!({"url": "http://localhost/", "method": "NOT A METHOD"})
            .as_object()
            .unwrap()
            .clone();
        let err = HttpTool::new().execute(args).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[test]
    fn test_definition_requires_url() {
        let def = HttpTool::new().definition();
        assert_eq!(def.name, "http");
        assert_eq!(def.input_schema["required"][0], "url");
    }
}
