//! Error handling for the MCP layer

use crate::jsonrpc::JsonRpcError;
use thiserror::Error;

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// Errors that can occur while serving MCP requests
#[derive(Debug, Error)]
pub enum McpError {
    #[error(transparent)]
    Client(#[from] starlink_client::ClientError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    /// Convert to a JSON-RPC error object
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            McpError::Serialization(err) => {
                JsonRpcError::parse_error().with_data(serde_json::json!({"message": err.to_string()}))
            }
            McpError::InvalidArguments(msg) => {
                JsonRpcError::invalid_params().with_data(serde_json::json!({"message": msg}))
            }
            McpError::MissingArgument(field) => JsonRpcError::invalid_params()
                .with_data(serde_json::json!({"message": self.to_string(), "field": field})),
            McpError::ToolNotFound(name) => JsonRpcError::method_not_found()
                .with_data(serde_json::json!({"message": format!("Unknown tool: {}", name)})),
            _ => JsonRpcError::internal_error()
                .with_data(serde_json::json!({"message": self.to_string()})),
        }
    }
}
