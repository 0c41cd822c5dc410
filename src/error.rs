//! Error types for the MCP bridge server.

use thiserror::Error;

use crate::rpc::protocol::error_codes;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the MCP bridge.
#[derive(Error, Debug)]
pub enum Error {
    // ===== JSON-RPC Errors =====
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    // ===== Handler Errors =====
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    // ===== Connection Errors =====
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Connection expired: {0}")]
    ConnectionExpired(String),

    #[error("Transport error: {0}")]
    Transport(String),

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // ===== Internal Errors =====
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to its JSON-RPC error code.
    ///
    /// Anything raised inside a registered handler that is not a
    /// params/method violation collapses to the generic server error.
    pub fn rpc_error_code(&self) -> i32 {
        match self {
            Self::Parse(_) | Self::Json(_) => error_codes::PARSE_ERROR,
            Self::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => error_codes::INVALID_PARAMS,
            _ => error_codes::SERVER_ERROR,
        }
    }

    /// Whether this error is surfaced at the relay boundary as an HTTP
    /// status rather than being folded into a JSON-RPC error object.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionNotFound(_) | Self::ConnectionExpired(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MethodNotFound("tool.run".to_string());
        assert_eq!(err.to_string(), "Method not found: tool.run");

        let err = Error::ConnectionNotFound("abc-123".to_string());
        assert_eq!(err.to_string(), "Connection not found: abc-123");

        let err = Error::Parse("unexpected end of input".to_string());
        assert_eq!(err.to_string(), "Parse error: unexpected end of input");
    }

    #[test]
    fn test_rpc_error_codes() {
        assert_eq!(Error::Parse("x".into()).rpc_error_code(), -32700);
        assert_eq!(Error::InvalidRequest("x".into()).rpc_error_code(), -32600);
        assert_eq!(Error::MethodNotFound("x".into()).rpc_error_code(), -32601);
        assert_eq!(Error::InvalidParams("x".into()).rpc_error_code(), -32602);
        assert_eq!(Error::ToolNotFound("x".into()).rpc_error_code(), -32000);
        assert_eq!(Error::Internal("x".into()).rpc_error_code(), -32000);
    }

    #[test]
    fn test_connection_error_classification() {
        assert!(Error::ConnectionNotFound("a".into()).is_connection_error());
        assert!(Error::ConnectionExpired("a".into()).is_connection_error());
        assert!(!Error::MethodNotFound("a".into()).is_connection_error());
        assert!(!Error::Transport("a".into()).is_connection_error());
    }
}
