//! Process configuration read from `RAPPORT_*` environment variables.
//!
//! Unset, blank, unparsable, or out-of-range values fall back to defaults.

use crate::llm::chat::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_USER_AGENT};
use crate::logging::default_log_level;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "rapport.db";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_EXTRACT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_COMPARE_TIMEOUT_MS: u64 = 15_000;

/// Text-generation settings shared by extraction and detail comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    /// No key means no provider is built and callers use their fallbacks.
    pub api_key: Option<String>,
    pub endpoint: String,
    /// Tried in this order.
    pub models: Vec<String>,
    pub extract_timeout_ms: u64,
    pub compare_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            models: vec![DEFAULT_MODEL.to_string()],
            extract_timeout_ms: DEFAULT_EXTRACT_TIMEOUT_MS,
            compare_timeout_ms: DEFAULT_COMPARE_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl LlmConfig {
    pub fn extract_timeout(&self) -> Duration {
        Duration::from_millis(self.extract_timeout_ms)
    }

    pub fn compare_timeout(&self) -> Duration {
        Duration::from_millis(self.compare_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind: String,
    pub log_level: String,
    /// Must be absolute when set; the binary picks a default otherwise.
    pub log_dir: Option<PathBuf>,
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            bind: DEFAULT_BIND.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
            llm: LlmConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let llm = LlmConfig {
            api_key: get("RAPPORT_LLM_API_KEY").or_else(|| get("NVIDIA_API_KEY")),
            endpoint: get("RAPPORT_LLM_ENDPOINT").unwrap_or(defaults.llm.endpoint),
            models: get("RAPPORT_LLM_MODELS")
                .map(|raw| parse_model_list(&raw))
                .filter(|models| !models.is_empty())
                .unwrap_or(defaults.llm.models),
            extract_timeout_ms: parse_ms(
                get("RAPPORT_LLM_EXTRACT_TIMEOUT_MS"),
                1_000..=300_000,
                DEFAULT_EXTRACT_TIMEOUT_MS,
            ),
            compare_timeout_ms: parse_ms(
                get("RAPPORT_LLM_COMPARE_TIMEOUT_MS"),
                1_000..=120_000,
                DEFAULT_COMPARE_TIMEOUT_MS,
            ),
            user_agent: get("RAPPORT_LLM_USER_AGENT").unwrap_or(defaults.llm.user_agent),
        };

        Self {
            db_path: get("RAPPORT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            bind: get("RAPPORT_HTTP_BIND").unwrap_or(defaults.bind),
            log_level: get("RAPPORT_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: get("RAPPORT_LOG_DIR").map(PathBuf::from),
            llm,
        }
    }
}

/// Comma-separated list, order kept, duplicates dropped.
fn parse_model_list(raw: &str) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for model in raw.split(',').map(str::trim).filter(|m| !m.is_empty()) {
        if !models.iter().any(|existing| existing == model) {
            models.push(model.to_string());
        }
    }
    models
}

fn parse_ms(raw: Option<String>, range: std::ops::RangeInclusive<u64>, default: u64) -> u64 {
    raw.and_then(|value| value.parse::<u64>().ok())
        .filter(|value| range.contains(value))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, DEFAULT_BIND, DEFAULT_COMPARE_TIMEOUT_MS};
    use crate::llm::chat::DEFAULT_MODEL;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.llm.models, vec![DEFAULT_MODEL.to_string()]);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn reads_overrides_and_dedupes_models() {
        let config = config_from(&[
            ("RAPPORT_DB_PATH", "/tmp/r.db"),
            ("RAPPORT_HTTP_BIND", "0.0.0.0:9000"),
            ("RAPPORT_LLM_API_KEY", " secret "),
            ("RAPPORT_LLM_MODELS", "a/b, c ,a/b,,"),
            ("RAPPORT_LLM_EXTRACT_TIMEOUT_MS", "5000"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/tmp/r.db"));
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(config.llm.models, vec!["a/b".to_string(), "c".to_string()]);
        assert_eq!(config.llm.extract_timeout_ms, 5_000);
    }

    #[test]
    fn out_of_range_timeouts_fall_back() {
        let config = config_from(&[
            ("RAPPORT_LLM_COMPARE_TIMEOUT_MS", "5"),
            ("RAPPORT_LLM_EXTRACT_TIMEOUT_MS", "soon"),
        ]);
        assert_eq!(config.llm.compare_timeout_ms, DEFAULT_COMPARE_TIMEOUT_MS);
        assert_eq!(config.llm.extract_timeout_ms, 60_000);
    }

    #[test]
    fn vendor_key_is_a_fallback_only() {
        let config = config_from(&[("NVIDIA_API_KEY", "vendor")]);
        assert_eq!(config.llm.api_key.as_deref(), Some("vendor"));
        let config = config_from(&[("NVIDIA_API_KEY", "vendor"), ("RAPPORT_LLM_API_KEY", "own")]);
        assert_eq!(config.llm.api_key.as_deref(), Some("own"));
    }
}
