//! Free-text extraction use-case.

use crate::llm::chain::ChainError;
use crate::llm::extraction::{Extractor, MAX_EXTRACT_CHARS};
use crate::model::extraction::ExtractionPayload;
use crate::model::validation::{limit_chars, require_text};
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};

pub struct ExtractService {
    extractor: Extractor,
}

impl ExtractService {
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }

    /// Validates the text and asks the provider chain for a payload.
    ///
    /// # Errors
    /// - `InvalidInput` for blank text or text over the character limit.
    /// - `Unavailable` when no provider is configured or all of them failed.
    pub fn extract(&self, text: &str) -> ServiceResult<ExtractionPayload> {
        let text = require_text("text", text)?;
        limit_chars("text", &text, MAX_EXTRACT_CHARS)?;

        match self.extractor.extract(&text) {
            Ok(payload) => {
                info!(
                    "event=extract module=service status=ok chars={} events={} annotations={} developments={} relations={}",
                    text.chars().count(),
                    payload.profile.events.len(),
                    payload.annotations.len(),
                    payload.developments.len(),
                    payload.relations.len()
                );
                Ok(payload)
            }
            Err(err) => {
                let status = match err {
                    ChainError::Empty => "unconfigured",
                    ChainError::Exhausted(_) => "exhausted",
                };
                warn!("event=extract module=service status=error reason={status}");
                Err(ServiceError::Unavailable(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ExtractService;
    use crate::llm::chain::ProviderChain;
    use crate::llm::extraction::Extractor;

    fn unconfigured() -> ExtractService {
        ExtractService::new(Extractor::new(ProviderChain::new()))
    }

    #[test]
    fn blank_and_oversized_text_is_invalid_input() {
        let service = unconfigured();
        assert_eq!(service.extract("   ").unwrap_err().code(), "invalid_input");
        let long = "字".repeat(2001);
        assert_eq!(service.extract(&long).unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn unconfigured_chain_is_unavailable() {
        let err = unconfigured().extract("和张三吃饭").unwrap_err();
        assert_eq!(err.code(), "unavailable");
    }
}
