use super::{LLMError, LLMProvider, LLMResponse, Message, MessageRole};
use crate::config::OpenAIConfig;
use crate::secrets::SecretCache;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Keychain / environment key for the API key
pub const OPENAI_API_KEY: &str = "openai_api_key";

/// OpenAI-compatible chat completions provider
///
/// Works against any server exposing `/chat/completions` (OpenAI, vLLM,
/// LiteLLM and similar gateways).
pub struct OpenAIProvider {
    config: OpenAIConfig,
    secret_cache: Arc<SecretCache>,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig, secret_cache: Arc<SecretCache>) -> Self {
        Self {
            config,
            secret_cache,
            client: reqwest::Client::new(),
        }
    }

    fn convert_messages(messages: &[Message]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|msg| match msg.role {
                // Tool output travels as plain text; no native tool_call ids are issued
                MessageRole::Tool => json!({
                    "role": "user",
                    "content": format!("Tool result:\n{}", msg.content),
                }),
                role => json!({
                    "role": role.to_string(),
                    "content": msg.content,
                }),
            })
            .collect()
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_local(&self) -> bool {
        false
    }

    fn estimated_cost(&self, tokens: usize) -> f64 {
        // Approx $0.002 per 1k tokens for gpt-4o-mini
        (tokens as f64 / 1000.0) * 0.002
    }

    async fn check_health(&self) -> bool {
        self.secret_cache.has_secret(OPENAI_API_KEY)
    }

    async fn generate(&self, messages: &[Message]) -> super::Result<LLMResponse> {
        let api_key = self
            .secret_cache
            .get_secret(OPENAI_API_KEY)
            .map_err(|e| LLMError::AuthenticationFailed(e.to_string()))?;

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let payload = json!({
            "model": self.config.model,
            "messages": Self::convert_messages(messages),
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.unsecure())
            .json(&payload)
            .send()
            .await
            .map_err(LLMError::from_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, text));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let content = data
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| LLMError::ParseError("No message content in response".to_string()))?;

        Ok(super::classify_content(content.to_string()))
    }
}
