//! Switchboard SDK
//!
//! Shared library providing traits and types for Switchboard components.
//! This crate is used by both the engine and the HTTP API server.

/// Error types and handling
pub mod errors;

/// Query service trait and status types
pub mod service;

// Re-export commonly used types
pub use errors::{EngineError, ErrorExt};
pub use service::{IntegrationStatus, QueryService, ServiceHandle, ServiceStatus};
