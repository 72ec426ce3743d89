//! Error types and handling
//!
//! This module provides the error types used at the boundary between the
//! Switchboard engine and its callers (the HTTP layer and the CLI).
//! All errors implement the `ErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry access tokens or API keys. Backend responses
//! are included verbatim only for diagnostics and are safe to log.

use thiserror::Error;

/// Trait for Switchboard error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain:
    /// - Secrets (API keys, tokens, passwords)
    /// - Internal implementation details
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried. Non-recoverable errors require a
    /// configuration change or a restart.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **LLM Provider**: API failures, authentication errors, timeouts
/// - **Agent loop**: Iteration and size limits
/// - **Tools**: Tool server (MCP) and document retrieval failures
/// - **Secrets**: Keychain access failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorExt};
///
/// let error = EngineError::LLMTimeout;
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::AllProvidersExhausted;
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // LLM routing errors
    #[error("All LLM providers exhausted")]
    AllProvidersExhausted,

    // Agent loop errors
    #[error("Max iterations exceeded")]
    MaxIterationsExceeded,

    #[error("LLM call timed out")]
    LLMTimeout,

    #[error("Result size exceeded: {size} bytes > {limit} bytes")]
    ResultSizeExceeded { size: usize, limit: usize },

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("MCP error: {0}")]
    Mcp(String),

    // Document retrieval errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    // Integration errors
    #[error("Integration disabled: {0}")]
    IntegrationDisabled(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::LLMProvider(_) => "LLM provider unavailable. Check your API keys and network",
            Self::AllProvidersExhausted => "No LLM providers available. Check configuration",

            Self::MaxIterationsExceeded => "Request too complex. Try a more specific question",
            Self::LLMTimeout => "LLM provider took too long to respond. Try again",
            Self::ResultSizeExceeded { .. } => "Result too large. Try a more specific query",

            Self::ToolNotFound(_) => "The requested tool is not available",
            Self::ToolError(_) => "Tool operation failed",
            Self::Mcp(_) => "Task tool server failed. Check ASANA_ACCESS_TOKEN and npx",
            Self::Retrieval(_) => "Document search failed. Check the knowledge base settings",

            Self::IntegrationDisabled(_) => "This integration is not configured",

            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",

            Self::Network(_) => "Network operation failed. Check your connection",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::AllProvidersExhausted | Self::Config(_) | Self::IntegrationDisabled(_) => false,

            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::Config("missing port".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing port");

        let err = EngineError::ResultSizeExceeded { size: 10, limit: 5 };
        assert_eq!(err.to_string(), "Result size exceeded: 10 bytes > 5 bytes");
    }

    #[test]
    fn test_recoverability() {
        assert!(EngineError::LLMTimeout.is_recoverable());
        assert!(EngineError::Mcp("broken pipe".to_string()).is_recoverable());
        assert!(!EngineError::AllProvidersExhausted.is_recoverable());
        assert!(!EngineError::IntegrationDisabled("asana".to_string()).is_recoverable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
        assert_eq!(err.user_hint(), "File system operation failed");
    }
}
