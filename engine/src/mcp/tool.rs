use async_trait::async_trait;
use sdk::errors::EngineError;
use std::sync::Arc;

use super::client::McpClient;
use super::types::McpToolInfo;
use crate::tools::Tool;

/// Exposes one remote MCP tool through the local [`Tool`] trait
pub struct McpTool {
    client: Arc<McpClient>,
    info: McpToolInfo,
}

impl McpTool {
    pub fn new(client: Arc<McpClient>, info: McpToolInfo) -> Self {
        Self { client, info }
    }

    /// Wrap every tool the client advertises
    pub fn wrap_all(client: &Arc<McpClient>, infos: Vec<McpToolInfo>) -> Vec<Box<dyn Tool>> {
        infos
            .into_iter()
            .map(|info| Box::new(Self::new(Arc::clone(client), info)) as Box<dyn Tool>)
            .collect()
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn description(&self) -> &str {
        self.info.description.as_deref().unwrap_or("")
    }

    fn parameters(&self) -> serde_json::Value {
        self.info.input_schema.clone()
    }

    async fn call(&self, args: serde_json::Value) -> Result<String, EngineError> {
        Ok(self.client.call_tool(&self.info.name, args).await?)
    }
}
