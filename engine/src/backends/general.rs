use std::sync::Arc;

use crate::agent::extract;
use crate::llm::router::LLMRouter;
use crate::llm::Message;
use sdk::errors::EngineError;

/// Plain conversation: the prompt goes to the model as a single user turn
pub struct GeneralBackend {
    router: Arc<LLMRouter>,
}

impl GeneralBackend {
    pub fn new(router: Arc<LLMRouter>) -> Self {
        Self { router }
    }

    /// The LLM router answers are drawn from
    pub fn router(&self) -> &LLMRouter {
        &self.router
    }

    /// Answer a prompt with no tools and no system prompt
    pub async fn handle(&self, query: &str) -> Result<String, EngineError> {
        let (response, provider) = self.router.call(&[Message::user(query)]).await?;
        tracing::debug!("General answer from {}", provider);

        // Without tools a tool-call shaped reply is just text
        let reply = Message::assistant(response.into_text());

        Ok(extract::extract(&[reply]))
    }
}
