use super::{LLMError, LLMProvider, LLMResponse, Message, MessageRole};
use crate::config::AnthropicConfig;
use crate::secrets::SecretCache;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Keychain / environment key for the API key
pub const ANTHROPIC_API_KEY: &str = "anthropic_api_key";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    config: AnthropicConfig,
    secret_cache: Arc<SecretCache>,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig, secret_cache: Arc<SecretCache>) -> Self {
        Self {
            config,
            secret_cache,
            client: reqwest::Client::new(),
        }
    }

    /// Split out system turns and fold the rest into alternating user/assistant turns
    fn build_payload(&self, messages: &[Message]) -> serde_json::Value {
        let mut system_prompt = String::new();
        let mut api_messages: Vec<serde_json::Value> = Vec::new();

        for msg in messages {
            let (role, content) = match msg.role {
                MessageRole::System => {
                    if !system_prompt.is_empty() {
                        system_prompt.push('\n');
                    }
                    system_prompt.push_str(&msg.content);
                    continue;
                }
                MessageRole::Assistant => ("assistant", msg.content.clone()),
                MessageRole::User => ("user", msg.content.clone()),
                MessageRole::Tool => ("user", format!("Tool result:\n{}", msg.content)),
            };

            // The Messages API rejects consecutive turns with the same role
            if let Some(last) = api_messages.last_mut() {
                if last["role"] == role {
                    let merged = format!("{}\n\n{}", last["content"].as_str().unwrap_or_default(), content);
                    last["content"] = json!(merged);
                    continue;
                }
            }

            api_messages.push(json!({ "role": role, "content": content }));
        }

        json!({
            "model": self.config.model,
            "max_tokens": MAX_TOKENS,
            "system": system_prompt,
            "messages": api_messages,
        })
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn is_local(&self) -> bool {
        false
    }

    fn estimated_cost(&self, tokens: usize) -> f64 {
        // Approx $0.003 per 1k tokens for claude sonnet
        (tokens as f64 / 1000.0) * 0.003
    }

    async fn check_health(&self) -> bool {
        self.secret_cache.has_secret(ANTHROPIC_API_KEY)
    }

    async fn generate(&self, messages: &[Message]) -> super::Result<LLMResponse> {
        let api_key = self
            .secret_cache
            .get_secret(ANTHROPIC_API_KEY)
            .map_err(|e| LLMError::AuthenticationFailed(e.to_string()))?;

        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key.unsecure())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_payload(messages))
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

        let blocks = data
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LLMError::ParseError("No content array in response".to_string()))?;

        let text: String = blocks
            .iter()
            .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
            .collect();

        Ok(super::classify_content(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretManager;

    fn provider() -> AnthropicProvider {
        let secrets = Arc::new(SecretCache::new(Arc::new(SecretManager::new("switchboard-test"))));
        AnthropicProvider::new(AnthropicConfig::default(), secrets)
    }

    #[test]
    fn test_payload_splits_system_and_merges_roles() {
        let payload = provider().build_payload(&[
            Message::system("あなたはタスク管理アシスタントです。"),
            Message::user("今週のタスクは？"),
            Message::assistant(r#"{"function": "asana_list_workspaces", "arguments": {}}"#),
            Message::tool_result("[]", "call_1"),
            Message::user("続けて"),
        ]);

        assert_eq!(payload["system"], "あなたはタスク管理アシスタントです。");
        let messages = payload["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2]["role"], "user");
        assert!(messages[2]["content"].as_str().unwrap().contains("続けて"));
    }
}
