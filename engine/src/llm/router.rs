//! LLM Router
//!
//! Orders the configured providers and fails over between them. The
//! configured default provider is always tried first; the rest follow in
//! order of estimated cost for the conversation, cheapest first. Each attempt
//! is bounded by a timeout that is longer for local providers, since they may
//! need to load the model before answering.

use super::anthropic::{AnthropicProvider, ANTHROPIC_API_KEY};
use super::ollama::OllamaProvider;
use super::openai::{OpenAIProvider, OPENAI_API_KEY};
use super::{LLMError, LLMProvider, LLMResponse, Message};
use crate::config::LLMConfig;
use crate::secrets::SecretCache;
use std::sync::Arc;
use std::time::Duration;

/// Per-attempt timeout for local providers (model load + generation)
pub const LOCAL_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-attempt timeout for cloud providers
pub const CLOUD_TIMEOUT: Duration = Duration::from_secs(30);

/// LLM Router with ordered failover
pub struct LLMRouter {
    providers: Vec<Box<dyn LLMProvider>>,
    default_provider: String,
}

impl LLMRouter {
    /// Create a new LLM router
    ///
    /// # Arguments
    /// * `providers` - List of available LLM providers
    /// * `default_provider` - Name of the provider to try first
    pub fn new(providers: Vec<Box<dyn LLMProvider>>, default_provider: impl Into<String>) -> Self {
        Self {
            providers,
            default_provider: default_provider.into(),
        }
    }

    /// Build the provider set from the `[llm]` config section
    ///
    /// Ollama is always registered. Cloud providers are registered only when
    /// their API key can be found, or when they are the configured default
    /// (so a missing key surfaces as an authentication error instead of a
    /// silent fallback).
    pub fn from_config(config: &LLMConfig, secrets: Arc<SecretCache>) -> super::Result<Self> {
        let mut providers: Vec<Box<dyn LLMProvider>> = Vec::new();

        providers.push(Box::new(OllamaProvider::from_config(&config.ollama)?));

        if config.default_provider == "openai" || secrets.has_secret(OPENAI_API_KEY) {
            providers.push(Box::new(OpenAIProvider::new(
                config.openai.clone(),
                Arc::clone(&secrets),
            )));
        }

        if config.default_provider == "anthropic" || secrets.has_secret(ANTHROPIC_API_KEY) {
            providers.push(Box::new(AnthropicProvider::new(
                config.anthropic.clone(),
                Arc::clone(&secrets),
            )));
        }

        let router = Self::new(providers, config.default_provider.clone());
        tracing::info!(
            "LLM router ready: providers=[{}], default={}",
            router.provider_names().join(", "),
            router.default_provider
        );

        Ok(router)
    }

    /// Names of the registered providers, in registration order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Name of the provider tried first
    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    /// Estimate token count for the conversation
    ///
    /// Uses a simple heuristic: ~4 characters per token
    pub fn estimate_tokens(messages: &[Message]) -> usize {
        let total_chars: usize = messages.iter().map(|m| m.content.len()).sum();
        total_chars / 4
    }

    /// Order providers for an attempt
    ///
    /// The default provider comes first, then the rest by ascending cost.
    /// Ties keep registration order.
    pub fn rank_providers(&self, estimated_tokens: usize) -> Vec<&dyn LLMProvider> {
        let mut providers: Vec<&dyn LLMProvider> =
            self.providers.iter().map(|b| b.as_ref()).collect();

        providers.sort_by(|a, b| {
            let a_default = a.name() == self.default_provider;
            let b_default = b.name() == self.default_provider;

            b_default.cmp(&a_default).then_with(|| {
                a.estimated_cost(estimated_tokens)
                    .partial_cmp(&b.estimated_cost(estimated_tokens))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });

        providers
    }

    /// Call LLM providers with automatic failover
    ///
    /// Returns the response together with the name of the provider that
    /// produced it.
    ///
    /// # Errors
    /// `LLMError::ProviderUnavailable` when no provider is registered,
    /// `LLMError::Exhausted` when every provider failed or timed out.
    pub async fn call(&self, messages: &[Message]) -> super::Result<(LLMResponse, String)> {
        if self.providers.is_empty() {
            return Err(LLMError::ProviderUnavailable(
                "No LLM providers configured".to_string(),
            ));
        }

        let ranked_providers = self.rank_providers(Self::estimate_tokens(messages));

        for provider in ranked_providers {
            let timeout = if provider.is_local() {
                LOCAL_TIMEOUT
            } else {
                CLOUD_TIMEOUT
            };
            tracing::debug!(
                "Attempting provider: {} (timeout: {}s)",
                provider.name(),
                timeout.as_secs()
            );

            match tokio::time::timeout(timeout, provider.generate(messages)).await {
                Ok(Ok(response)) => {
                    tracing::info!("Provider {} succeeded", provider.name());
                    return Ok((response, provider.name().to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!("Provider {} failed: {}", provider.name(), e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Provider {} timed out after {}s",
                        provider.name(),
                        timeout.as_secs()
                    );
                }
            }
        }

        tracing::error!("All LLM providers exhausted");
        Err(LLMError::Exhausted)
    }

    /// Check the health of all registered providers
    /// Returns a list of (provider_name, is_healthy)
    pub async fn check_health(&self) -> Vec<(&str, bool)> {
        let mut results = Vec::new();
        for provider in &self.providers {
            let is_healthy = provider.check_health().await;
            results.push((provider.name(), is_healthy));
        }
        results
    }
}
