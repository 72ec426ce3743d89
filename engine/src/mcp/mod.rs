//! Model Context Protocol client
//!
//! Just enough of MCP to drive a stdio tool server: the `initialize`
//! handshake, `tools/list` and `tools/call`. Remote tools are adapted to the
//! agent's [`crate::tools::Tool`] trait by [`McpTool`].

pub mod client;
pub mod error;
pub mod tool;
pub mod types;

pub use client::{McpClient, McpServerConfig};
pub use error::McpError;
pub use tool::McpTool;
pub use types::McpToolInfo;
