use thiserror::Error;

use crate::protocol::JsonRpcError;

#[derive(Debug, Error)]
pub enum McpError {
    /// JSON-RPC error object returned by the gateway
    #[error("MCP server error: {0}")]
    Server(#[from] JsonRpcError),

    /// The gateway answered with a non-success HTTP status
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, TLS or timeout failure
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected message shape, missing response, id mismatch
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl McpError {
    pub fn transport(msg: impl Into<String>) -> Self {
        McpError::Transport(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        McpError::Protocol(msg.into())
    }

    /// True for 401/403 responses, i.e. a missing or expired bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, McpError::Http { status: 401 | 403, .. })
    }
}

pub type McpResult<T> = Result<T, McpError>;
