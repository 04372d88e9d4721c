//! OpenAI-compatible chat-completions provider over blocking HTTP.

use crate::llm::provider::{CompletionError, CompletionProvider};
use log::debug;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://integrate.api.nvidia.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "z-ai/glm4.7";
pub const DEFAULT_USER_AGENT: &str = concat!("rapport/", env!("CARGO_PKG_VERSION"));
const MIN_TIMEOUT: Duration = Duration::from_millis(100);

/// Connection settings for one model on one endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

pub struct ChatCompletionsProvider {
    provider_id: String,
    config: ChatCompletionsConfig,
    agent: ureq::Agent,
}

impl ChatCompletionsProvider {
    pub fn new(config: ChatCompletionsConfig) -> Self {
        let timeout = config.timeout.max(MIN_TIMEOUT);
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(&config.user_agent)
            .build();
        Self {
            provider_id: provider_id_for_model(&config.model),
            config,
            agent,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

impl CompletionProvider for ChatCompletionsProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let payload = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let response = self
            .agent
            .post(&self.config.endpoint)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .set("Authorization", &format!("Bearer {}", self.config.api_key))
            .send_json(payload)
            .map_err(completion_error_from_ureq)?;

        if response.status() != 200 {
            return Err(CompletionError::HttpStatus(response.status()));
        }
        let body: Value = response
            .into_json()
            .map_err(|err| CompletionError::InvalidResponse(err.to_string()))?;
        debug!(
            "event=llm_response module=llm status=ok provider={}",
            self.provider_id
        );
        answer_text(&body)
    }
}

/// Reads `choices[0].message.content`, falling back to reasoning fields.
pub(crate) fn answer_text(body: &Value) -> Result<String, CompletionError> {
    let message = body
        .pointer("/choices/0/message")
        .ok_or_else(|| CompletionError::InvalidResponse("missing choices[0].message".into()))?;
    ["content", "reasoning_content", "reasoning"]
        .iter()
        .filter_map(|field| message.get(*field).and_then(Value::as_str))
        .find(|text| !text.trim().is_empty())
        .map(str::to_string)
        .ok_or(CompletionError::EmptyContent)
}

/// Maps a model name like `z-ai/glm4.7` to an id like `z-ai_glm4_7`.
pub(crate) fn provider_id_for_model(model: &str) -> String {
    model
        .trim()
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn completion_error_from_ureq(err: ureq::Error) -> CompletionError {
    match err {
        ureq::Error::Status(status, _) => CompletionError::HttpStatus(status),
        ureq::Error::Transport(transport) => {
            let message = transport.to_string();
            let kind = classify_transport_error(&format!("{:?} {message}", transport.kind()));
            CompletionError::Transport { kind, message }
        }
    }
}

fn classify_transport_error(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}
