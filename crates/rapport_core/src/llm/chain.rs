//! Ordered provider chain with first-acceptable-answer selection.

use crate::llm::json::extract_json_object;
use crate::llm::provider::{CompletionError, CompletionProvider};
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Provider registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderChainError {
    InvalidProviderId(String),
    DuplicateProviderId(String),
}

impl Display for ProviderChainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidProviderId(value) => write!(f, "provider id is invalid: {value}"),
            Self::DuplicateProviderId(value) => {
                write!(f, "provider id already registered: {value}")
            }
        }
    }
}

impl Error for ProviderChainError {}

/// Why one attempt was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Completion(CompletionError),
    NoJsonObject,
    InvalidJson(String),
    Rejected,
}

impl Display for AttemptFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completion(err) => write!(f, "{err}"),
            Self::NoJsonObject => write!(f, "answer contains no JSON object"),
            Self::InvalidJson(message) => write!(f, "answer JSON is invalid: {message}"),
            Self::Rejected => write!(f, "answer JSON has the wrong shape"),
        }
    }
}

impl AttemptFailure {
    fn kind(&self) -> &'static str {
        match self {
            Self::Completion(err) => err.kind(),
            Self::NoJsonObject => "no_json_object",
            Self::InvalidJson(_) => "invalid_json",
            Self::Rejected => "rejected",
        }
    }
}

/// The chain produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// No provider is configured.
    Empty,
    /// Every provider was tried; failures are listed in chain order.
    Exhausted(Vec<(String, AttemptFailure)>),
}

impl Display for ChainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "no text-generation provider is configured"),
            Self::Exhausted(failures) => {
                write!(f, "all {} text-generation providers failed", failures.len())?;
                if let Some((provider_id, failure)) = failures.last() {
                    write!(f, "; last ({provider_id}): {failure}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for ChainError {}

/// Providers tried in registration order.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn CompletionProvider>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one provider to the end of the chain.
    pub fn register(
        &mut self,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<(), ProviderChainError> {
        let provider_id = provider.provider_id().trim().to_string();
        if !is_valid_provider_id(&provider_id) {
            return Err(ProviderChainError::InvalidProviderId(provider_id));
        }
        if self
            .providers
            .iter()
            .any(|existing| existing.provider_id().trim() == provider_id)
        {
            return Err(ProviderChainError::DuplicateProviderId(provider_id));
        }
        self.providers.push(provider);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider ids in chain order.
    pub fn provider_ids(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|provider| provider.provider_id().to_string())
            .collect()
    }

    /// Asks each provider in turn until `accept` returns a value.
    ///
    /// Each answer is reduced to its embedded JSON object before `accept`
    /// sees it. `purpose` only labels log lines.
    pub fn first_accepted<T, F>(
        &self,
        purpose: &str,
        system: &str,
        user: &str,
        mut accept: F,
    ) -> Result<T, ChainError>
    where
        F: FnMut(Value) -> Option<T>,
    {
        if self.providers.is_empty() {
            return Err(ChainError::Empty);
        }

        let mut failures = Vec::new();
        for provider in &self.providers {
            let provider_id = provider.provider_id();
            match attempt(provider.as_ref(), system, user, &mut accept) {
                Ok(value) => {
                    info!(
                        "event=llm_chain module=llm status=ok purpose={} provider={} failed_attempts={}",
                        purpose,
                        provider_id,
                        failures.len()
                    );
                    return Ok(value);
                }
                Err(failure) => {
                    warn!(
                        "event=llm_attempt module=llm status=error purpose={} provider={} error_kind={}",
                        purpose,
                        provider_id,
                        failure.kind()
                    );
                    failures.push((provider_id.to_string(), failure));
                }
            }
        }
        Err(ChainError::Exhausted(failures))
    }
}

fn attempt<T, F>(
    provider: &dyn CompletionProvider,
    system: &str,
    user: &str,
    accept: &mut F,
) -> Result<T, AttemptFailure>
where
    F: FnMut(Value) -> Option<T>,
{
    let answer = provider
        .complete(system, user)
        .map_err(AttemptFailure::Completion)?;
    let object = extract_json_object(&answer).ok_or(AttemptFailure::NoJsonObject)?;
    let value: Value = serde_json::from_str(object)
        .map_err(|err| AttemptFailure::InvalidJson(err.to_string()))?;
    accept(value).ok_or(AttemptFailure::Rejected)
}

fn is_valid_provider_id(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
