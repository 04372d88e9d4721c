//! Text-generation integration.
//!
//! # Responsibility
//! - Define the `CompletionProvider` seam and its OpenAI-compatible adapter.
//! - Try providers in order and accept the first usable JSON answer.
//! - Turn free text into an `ExtractionPayload`.
//!
//! # Invariants
//! - Provider failures never panic; they surface as `CompletionError` and the
//!   chain moves on to the next provider.
//! - Prompt and response text is never written to logs.

pub mod chain;
pub mod chat;
pub mod extraction;
pub mod json;
pub mod provider;

use crate::config::LlmConfig;
use chain::{ProviderChain, ProviderChainError};
use chat::{ChatCompletionsConfig, ChatCompletionsProvider};
use std::sync::Arc;
use std::time::Duration;

/// Builds one chat-completions provider per configured model.
///
/// Returns an empty chain when no api key is configured.
pub fn build_chain(
    config: &LlmConfig,
    timeout: Duration,
) -> Result<ProviderChain, ProviderChainError> {
    let mut chain = ProviderChain::new();
    let Some(api_key) = config.api_key.as_deref() else {
        return Ok(chain);
    };
    for model in &config.models {
        let provider = ChatCompletionsProvider::new(ChatCompletionsConfig {
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            model: model.clone(),
            timeout,
            user_agent: config.user_agent.clone(),
            ..ChatCompletionsConfig::default()
        });
        chain.register(Arc::new(provider))?;
    }
    Ok(chain)
}
