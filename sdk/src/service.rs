//! Query service handle
//!
//! The HTTP layer only ever sees the engine through `QueryService`. The
//! engine's dispatcher implements the trait; tests substitute their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::EngineError;

/// State of one optional backend integration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationStatus {
    /// The integration was configured and initialised at startup
    pub enabled: bool,

    /// The integration currently holds a live backend connection
    pub connected: bool,
}

impl IntegrationStatus {
    /// Render the integration as `"enabled"` or `"disabled"`
    pub fn label(&self) -> &'static str {
        if self.enabled {
            "enabled"
        } else {
            "disabled"
        }
    }
}

/// Snapshot of the service's integrations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Task-management tool server
    pub tasks: IntegrationStatus,

    /// Internal document knowledge base
    pub knowledge_base: IntegrationStatus,
}

/// Trait implemented by the engine to answer queries
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Route a prompt to its backend and return the display string
    async fn generate(&self, prompt: &str) -> Result<String, EngineError>;

    /// Report which integrations are available
    fn status(&self) -> ServiceStatus;
}

/// Cloneable handle around a shared `QueryService`
#[derive(Clone)]
pub struct ServiceHandle {
    inner: Arc<dyn QueryService>,
}

impl ServiceHandle {
    /// Create a new ServiceHandle with the given implementation
    pub fn new(inner: Arc<dyn QueryService>) -> Self {
        Self { inner }
    }

    /// Answer a prompt
    pub async fn generate(&self, prompt: &str) -> Result<String, EngineError> {
        self.inner.generate(prompt).await
    }

    /// Get the integration status
    pub fn status(&self) -> ServiceStatus {
        self.inner.status()
    }
}
