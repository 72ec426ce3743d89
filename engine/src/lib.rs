//! Switchboard Engine Library
//!
//! This library provides the core functionality of the Switchboard service.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Prompt classification (keyword matcher and query router)
pub mod intent;

/// LLM provider abstraction layer
pub mod llm;

/// Tool trait and registry
pub mod tools;

/// Agent loop core module
pub mod agent;

/// MCP stdio client
pub mod mcp;

/// Task, knowledge-base and general backends
pub mod backends;

/// Request dispatcher and service lifecycle
pub mod dispatcher;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;
