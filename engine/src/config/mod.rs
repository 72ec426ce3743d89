//! Configuration management
//!
//! This module handles loading, validation, and management of the Switchboard
//! configuration. Configuration is stored in TOML format at
//! ~/.switchboard/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **server**: HTTP bind address
//! - **llm**: LLM provider settings and preferences
//! - **agent**: Agent loop limits
//! - **tasks**: Task tool server (MCP) launch settings
//! - **knowledge_base**: Document retrieval settings
//! - **routing**: Additional keywords and patterns for the query router
//!
//! # Environment Overrides
//!
//! After the file is parsed, these environment variables take precedence:
//! - `BEDROCK_KNOWLEDGE_BASE_ID` → `knowledge_base.knowledge_base_id`
//! - `AWS_REGION` → `knowledge_base.region`
//!
//! The task tool server token (`ASANA_ACCESS_TOKEN`) is a secret and is read
//! through [`crate::secrets::SecretCache`], never stored in the file.
//!
//! # Examples
//!
//! ```no_run
//! use switchboard_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Listening on {}:{}", config.server.host, config.server.port);
//! println!("Default provider: {}", config.llm.default_provider);
//! # Ok(())
//! # }
//! ```

use regex::Regex;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Agent loop limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Task tool server configuration
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Knowledge base configuration
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,

    /// Query router additions
    #[serde(default)]
    pub routing: RoutingConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Default LLM provider (ollama, openai, anthropic)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Anthropic provider settings
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            ollama: OllamaConfig::default(),
            openai: OpenAIConfig::default(),
            anthropic: AnthropicConfig::default(),
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,
    // Note: API key comes from OPENAI_API_KEY or the OS keychain, not from config
}

/// Anthropic provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Base URL for Anthropic API
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_anthropic_model")]
    pub model: String,
    // Note: API key comes from ANTHROPIC_API_KEY or the OS keychain, not from config
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum think-act-observe cycles per request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Timeout for a single LLM call (seconds)
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            llm_timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Task tool server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Command used to launch the MCP tool server
    #[serde(default = "default_tasks_command")]
    pub command: String,

    /// Arguments for the launch command
    #[serde(default = "default_tasks_args")]
    pub args: Vec<String>,

    /// Timeout for a single JSON-RPC request (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            command: default_tasks_command(),
            args: default_tasks_args(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Knowledge base configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Knowledge base identifier; retrieval is disabled when absent
    #[serde(default)]
    pub knowledge_base_id: Option<String>,

    /// AWS region hosting the knowledge base
    #[serde(default = "default_region")]
    pub region: String,

    /// Override for the retrieval endpoint (defaults to the regional endpoint)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Number of documents to retrieve per query
    #[serde(default = "default_number_of_results")]
    pub number_of_results: u32,

    /// Search type (HYBRID or SEMANTIC)
    #[serde(default = "default_search_type")]
    pub search_type: String,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            knowledge_base_id: None,
            region: default_region(),
            endpoint: None,
            number_of_results: default_number_of_results(),
            search_type: default_search_type(),
        }
    }
}

impl KnowledgeBaseConfig {
    /// Resolve the retrieval endpoint for this configuration
    pub fn resolved_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-agent-runtime.{}.amazonaws.com", self.region),
        }
    }
}

/// Router additions layered on top of the built-in keyword sets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Extra task-domain keywords
    #[serde(default)]
    pub extra_task_keywords: Vec<String>,

    /// Extra document-domain keywords
    #[serde(default)]
    pub extra_document_keywords: Vec<String>,

    /// Extra document-domain regex patterns
    #[serde(default)]
    pub extra_document_patterns: Vec<String>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_max_iterations() -> usize {
    10
}

fn default_llm_timeout_secs() -> u64 {
    300
}

fn default_tasks_command() -> String {
    "npx".to_string()
}

fn default_tasks_args() -> Vec<String> {
    vec!["-y".to_string(), "@roychri/mcp-server-asana".to_string()]
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_number_of_results() -> u32 {
    5
}

fn default_search_type() -> String {
    "HYBRID".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Load configuration from the default location (~/.switchboard/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse, apply environment overrides and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default_config();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        // Overrides are applied after writing so env-only values never land on disk
        let mut config = config;
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.switchboard/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".switchboard").join("config.toml"))
    }

    /// Create a default configuration
    fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            server: ServerConfig::default(),
            llm: LLMConfig::default(),
            agent: AgentConfig::default(),
            tasks: TasksConfig::default(),
            knowledge_base: KnowledgeBaseConfig::default(),
            routing: RoutingConfig::default(),
        }
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(id) = non_empty_env("BEDROCK_KNOWLEDGE_BASE_ID") {
            self.knowledge_base.knowledge_base_id = Some(id);
        }
        if let Some(region) = non_empty_env("AWS_REGION") {
            self.knowledge_base.region = region;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["ollama", "openai", "anthropic"];
        if !valid_providers.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                valid_providers.join(", ")
            )));
        }

        if self.agent.max_iterations == 0 {
            return Err(EngineError::Config(
                "agent.max_iterations must be at least 1".to_string(),
            ));
        }

        if self.tasks.command.trim().is_empty() {
            return Err(EngineError::Config(
                "tasks.command must not be empty".to_string(),
            ));
        }

        if self.knowledge_base.number_of_results == 0 {
            return Err(EngineError::Config(
                "knowledge_base.number_of_results must be at least 1".to_string(),
            ));
        }

        let valid_search_types = ["HYBRID", "SEMANTIC"];
        if !valid_search_types.contains(&self.knowledge_base.search_type.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid search type '{}'. Must be one of: {}",
                self.knowledge_base.search_type,
                valid_search_types.join(", ")
            )));
        }

        for pattern in &self.routing.extra_document_patterns {
            Regex::new(pattern).map_err(|e| {
                EngineError::Config(format!("Invalid routing pattern '{}': {}", pattern, e))
            })?;
        }

        Ok(())
    }
}

/// Read an environment variable, ignoring unset and blank values
fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
