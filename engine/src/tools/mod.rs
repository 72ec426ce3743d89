//! Agent tools
//!
//! A tool is anything the agent can call by name with a JSON argument object.
//! Tools are held in a [`ToolRegistry`], which also renders the system prompt
//! that teaches the model the text tool-call protocol.

use async_trait::async_trait;
use sdk::errors::EngineError;
use tracing::{debug, warn};

/// A callable tool exposed to the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to invoke the tool
    fn name(&self) -> &str;

    /// One-line description shown in the system prompt
    fn description(&self) -> &str;

    /// JSON schema of the argument object
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    /// Invoke the tool
    async fn call(&self, args: serde_json::Value) -> Result<String, EngineError>;
}

/// Registry of tools that can be dispatched by the agent.
///
/// Tools keep their registration order, which is also the order they appear
/// in the system prompt.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a tool. A later tool with the same name shadows nothing;
    /// dispatch always picks the first match.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        debug!("Registering tool '{}'", tool.name());
        self.tools.push(tool);
    }

    /// Builder form of [`ToolRegistry::register`]
    pub fn with_tool(mut self, tool: Box<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when no tool is registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Dispatch a tool call by name, parsing arguments from JSON.
    ///
    /// Returns the tool output as a string. Errors are returned as
    /// `ERROR: ...` strings so the LLM can see the error and self-correct.
    pub async fn dispatch(&self, name: &str, arguments_json: &str) -> String {
        debug!("Dispatching tool '{}' with args: {}", name, arguments_json);

        let args: serde_json::Value = if arguments_json.trim().is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str(arguments_json) {
                Ok(v) => v,
                Err(e) => {
                    return format!("ERROR: Failed to parse arguments JSON: {}", e);
                }
            }
        };

        let Some(tool) = self.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return format!(
                "ERROR: Unknown tool '{}'. Available tools: {}",
                name,
                self.tool_names().join(", ")
            );
        };

        match tool.call(args).await {
            Ok(output) => output,
            Err(e) => {
                let message = crate::secrets::scrub(&e.to_string());
                warn!("Tool '{}' failed: {}", name, message);
                format!("ERROR: {}", message)
            }
        }
    }

    /// Generate a system prompt describing the protocol and available tools.
    ///
    /// `preamble` is the role description placed before the rules.
    pub fn system_prompt(&self, preamble: &str) -> String {
        let mut parts = vec![preamble.trim_end().to_string()];

        if self.tools.is_empty() {
            return parts.join("\n");
        }

        parts.extend([
            String::new(),
            "IMPORTANT RULES:".to_string(),
            "1. To call a tool, your ENTIRE response must be ONLY the JSON object. No explanation, no markdown fences, no text before or after.".to_string(),
            "2. When you have the final answer (after receiving tool results), respond with plain text only, never JSON.".to_string(),
            "3. Never guess or hallucinate tool output. Always call the tool and wait for the real result.".to_string(),
            "4. Private reasoning may be wrapped in <thinking></thinking>; it is removed before the answer is shown.".to_string(),
            String::new(),
            "Tool call format (your entire response must be exactly this):".to_string(),
            r#"{"function": "tool_name", "arguments": {"arg1": "value1"}}"#.to_string(),
            String::new(),
            "Available tools:".to_string(),
        ]);

        for tool in &self.tools {
            parts.push(String::new());
            parts.push(format!("## {}", tool.name()));
            parts.push(tool.description().to_string());
            parts.push(format!("Arguments schema: {}", tool.parameters()));
        }

        parts.join("\n")
    }

    /// Return the names of all registered tools.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}
