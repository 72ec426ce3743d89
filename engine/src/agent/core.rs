//! Agent Core
//!
//! Runs one request through an iterative think-act-observe cycle:
//!
//! 1. Seed the context with the system prompt and the user request
//! 2. Call the LLM router (bounded by the per-call timeout)
//! 3. On a tool call: dispatch it, append the result, continue
//! 4. On a final answer: stop and return the transcript
//!
//! # Limits
//!
//! - `max_iterations` model calls per run (default 10)
//! - per-call LLM timeout (default 300s)
//! - 5MB tool result / answer size limit
//!
//! The agent holds no per-request state, so one instance can serve
//! concurrent requests.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;
use crate::llm::router::LLMRouter;
use crate::llm::{LLMResponse, Message};
use crate::tools::ToolRegistry;
use sdk::errors::EngineError;

use super::WorkingMemory;

/// Maximum result size in bytes (5MB)
pub const MAX_RESULT_SIZE: usize = 5 * 1024 * 1024;

/// Outcome of one agent run
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Every turn of the run, untrimmed, in order
    pub transcript: Vec<Message>,

    /// Provider that produced the last model turn
    pub provider_used: String,

    /// Number of model calls made
    pub iterations: usize,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Agent Core that orchestrates the agent loop
pub struct AgentCore {
    router: Arc<LLMRouter>,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
    max_iterations: usize,
    llm_timeout: Duration,
}

impl AgentCore {
    /// Create a new agent core
    ///
    /// `preamble` describes the agent's role; the tool protocol and catalogue
    /// are appended to it.
    pub fn new(router: Arc<LLMRouter>, tools: Arc<ToolRegistry>, preamble: &str) -> Self {
        let defaults = AgentConfig::default();
        let system_prompt = tools.system_prompt(preamble);

        Self {
            router,
            tools,
            system_prompt,
            max_iterations: defaults.max_iterations,
            llm_timeout: Duration::from_secs(defaults.llm_timeout_secs),
        }
    }

    /// Apply the `[agent]` config section
    pub fn with_config(mut self, config: &AgentConfig) -> Self {
        self.max_iterations = config.max_iterations;
        self.llm_timeout = Duration::from_secs(config.llm_timeout_secs);
        self
    }

    /// Override the per-call LLM timeout
    pub fn with_llm_timeout(mut self, llm_timeout: Duration) -> Self {
        self.llm_timeout = llm_timeout;
        self
    }

    /// System prompt sent as the first turn of every run
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Run the agent loop for one request
    ///
    /// # Errors
    ///
    /// - `LLMTimeout` if a model call exceeds the per-call timeout
    /// - `AllProvidersExhausted` / `LLMProvider` if the router fails
    /// - `ResultSizeExceeded` if a tool result or answer exceeds 5MB
    /// - `MaxIterationsExceeded` if no final answer arrives in time
    pub async fn run(&self, input: &str) -> Result<AgentRun, EngineError> {
        let start_time = Instant::now();

        let mut memory = WorkingMemory::new();
        let mut transcript = Vec::new();

        record(&mut memory, &mut transcript, Message::system(&self.system_prompt));
        record(&mut memory, &mut transcript, Message::user(input));

        let mut provider_used = String::new();

        for iteration in 1..=self.max_iterations {
            debug!("Agent iteration {}/{}", iteration, self.max_iterations);

            let (response, provider) =
                match timeout(self.llm_timeout, self.router.call(memory.messages())).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => {
                        error!("LLM call failed: {}", e);
                        return Err(e.into());
                    }
                    Err(_) => {
                        error!("LLM call timed out after {}s", self.llm_timeout.as_secs());
                        return Err(EngineError::LLMTimeout);
                    }
                };
            provider_used = provider;

            match response {
                LLMResponse::ToolCall(tool_call) => {
                    debug!("Tool call: {} ({})", tool_call.name, tool_call.id);

                    // Assistant turn must precede the tool result
                    record(
                        &mut memory,
                        &mut transcript,
                        Message::assistant_tool_call(tool_call.clone()),
                    );

                    let tool_result = self
                        .tools
                        .dispatch(&tool_call.name, &tool_call.arguments)
                        .await;
                    check_size(tool_result.len())?;

                    record(
                        &mut memory,
                        &mut transcript,
                        Message::tool_result(tool_result, &tool_call.id),
                    );
                }
                LLMResponse::FinalAnswer(answer) => {
                    check_size(answer.content.len())?;
                    record(&mut memory, &mut transcript, Message::assistant(answer.content));

                    let duration_ms = start_time.elapsed().as_millis() as u64;
                    info!(
                        "Agent finished in {}ms after {} iterations (provider: {})",
                        duration_ms, iteration, provider_used
                    );

                    return Ok(AgentRun {
                        transcript,
                        provider_used,
                        iterations: iteration,
                        duration_ms,
                    });
                }
            }
        }

        error!("Agent exceeded max iterations ({})", self.max_iterations);
        Err(EngineError::MaxIterationsExceeded)
    }
}

/// Append a turn to both the context window and the full transcript
fn record(memory: &mut WorkingMemory, transcript: &mut Vec<Message>, message: Message) {
    transcript.push(message.clone());
    memory.add_message(message);
}

fn check_size(size: usize) -> Result<(), EngineError> {
    if size > MAX_RESULT_SIZE {
        warn!(
            "Result exceeds size limit: {} bytes > {} bytes",
            size, MAX_RESULT_SIZE
        );
        return Err(EngineError::ResultSizeExceeded {
            size,
            limit: MAX_RESULT_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FinalAnswer, LLMProvider, MessageRole, ToolCall};
    use crate::tools::Tool;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a fixed script of responses
    struct ScriptedProvider {
        script: Mutex<Vec<LLMResponse>>,
    }

    impl ScriptedProvider {
        fn new(mut script: Vec<LLMResponse>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn is_local(&self) -> bool {
            true
        }

        fn estimated_cost(&self, _tokens: usize) -> f64 {
            0.0
        }

        async fn generate(&self, _messages: &[Message]) -> crate::llm::Result<LLMResponse> {
            let next = self.script.lock().unwrap().pop();
            Ok(next.unwrap_or_else(|| {
                LLMResponse::ToolCall(ToolCall::new("loop", "lookup", "{}"))
            }))
        }
    }

    struct LookupTool;

    #[async_trait]
    impl Tool for LookupTool {
        fn name(&self) -> &str {
            "lookup"
        }

        fn description(&self) -> &str {
            "Look something up"
        }

        async fn call(&self, _args: serde_json::Value) -> Result<String, EngineError> {
            Ok("期限は金曜日です".to_string())
        }
    }

    fn agent(script: Vec<LLMResponse>) -> AgentCore {
        let router = Arc::new(LLMRouter::new(
            vec![Box::new(ScriptedProvider::new(script))],
            "scripted",
        ));
        let tools = Arc::new(ToolRegistry::empty().with_tool(Box::new(LookupTool)));
        AgentCore::new(router, tools, "You answer questions.")
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let run = agent(vec![LLMResponse::FinalAnswer(FinalAnswer::new("こんにちは"))])
            .run("hello")
            .await
            .unwrap();

        assert_eq!(run.iterations, 1);
        assert_eq!(run.provider_used, "scripted");
        assert_eq!(run.transcript.len(), 3);
        assert_eq!(run.transcript[0].role, MessageRole::System);
        assert_eq!(run.transcript[2].content, "こんにちは");
    }

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let run = agent(vec![
            LLMResponse::ToolCall(ToolCall::new("call_1", "lookup", "{}")),
            LLMResponse::FinalAnswer(FinalAnswer::new("金曜日です")),
        ])
        .run("期限は？")
        .await
        .unwrap();

        assert_eq!(run.iterations, 2);
        let roles: Vec<MessageRole> = run.transcript.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::Tool,
                MessageRole::Assistant,
            ]
        );
        assert!(run.transcript[2].has_tool_calls());
        assert_eq!(run.transcript[3].content, "期限は金曜日です");
        assert_eq!(run.transcript[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn test_max_iterations_exceeded() {
        let agent = agent(vec![]).with_config(&AgentConfig {
            max_iterations: 3,
            ..AgentConfig::default()
        });

        let result = agent.run("loop forever").await;
        assert!(matches!(result, Err(EngineError::MaxIterationsExceeded)));
    }

    #[test]
    fn test_system_prompt_includes_tools() {
        let agent = agent(vec![]);
        assert!(agent.system_prompt().starts_with("You answer questions."));
        assert!(agent.system_prompt().contains("## lookup"));
    }

    #[test]
    fn test_check_size() {
        assert!(check_size(MAX_RESULT_SIZE).is_ok());
        assert!(matches!(
            check_size(MAX_RESULT_SIZE + 1),
            Err(EngineError::ResultSizeExceeded { .. })
        ));
    }
}
