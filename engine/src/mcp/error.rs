use sdk::errors::EngineError;
use thiserror::Error;

/// Errors that can occur while talking to an MCP tool server
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Failed to spawn server process: {source}")]
    Spawn {
        #[from]
        source: std::io::Error,
    },

    #[error("Server process terminated unexpectedly: {0}")]
    ProcessTerminated(String),

    #[error("Failed to communicate with server: {0}")]
    Communication(String),

    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc { code: i64, message: String },

    #[error("Request '{0}' timed out")]
    Timeout(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Tool reported an error: {0}")]
    ToolFailed(String),

    #[error("Client is closed")]
    NotConnected,
}

impl From<McpError> for EngineError {
    fn from(err: McpError) -> Self {
        EngineError::Mcp(err.to_string())
    }
}

/// Result type alias for MCP operations
pub type Result<T> = std::result::Result<T, McpError>;
