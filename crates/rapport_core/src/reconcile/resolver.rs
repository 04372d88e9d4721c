//! Picks the more detailed of two event descriptions.

use crate::llm::chain::ProviderChain;
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

const FALLBACK_DESC2_LONGER: &str = "fallback: desc2 is longer";
const FALLBACK_DESC1_AT_LEAST_AS_LONG: &str = "fallback: desc1 is at least as long";

const COMPARE_SYSTEM_PROMPT: &str = r#"你是一个信息比较助手。用户会给出同一事件的两段描述 desc1 和 desc2，请判断哪一段包含的信息更详细（人物、地点、细节更多）。
只输出如下JSON，不要包含任何额外说明：
{"more_detailed": "desc1" 或 "desc2", "reason": "简短理由"}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Desc1,
    Desc2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailChoice {
    pub choice: Choice,
    pub reason: String,
}

/// Decides which of two descriptions of the same event carries more detail.
pub trait DetailPreference {
    fn pick_more_detailed(&self, desc1: &str, desc2: &str) -> DetailChoice;
}

/// Deterministic rule: `desc2` only wins when it has strictly more characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthPreference;

impl DetailPreference for LengthPreference {
    fn pick_more_detailed(&self, desc1: &str, desc2: &str) -> DetailChoice {
        if desc2.chars().count() > desc1.chars().count() {
            DetailChoice {
                choice: Choice::Desc2,
                reason: FALLBACK_DESC2_LONGER.to_string(),
            }
        } else {
            DetailChoice {
                choice: Choice::Desc1,
                reason: FALLBACK_DESC1_AT_LEAST_AS_LONG.to_string(),
            }
        }
    }
}

/// Asks the provider chain, falling back to `LengthPreference` when the chain
/// is empty or every provider fails.
pub struct DetailResolver {
    chain: ProviderChain,
}

impl DetailResolver {
    pub fn new(chain: ProviderChain) -> Self {
        Self { chain }
    }
}

impl DetailPreference for DetailResolver {
    fn pick_more_detailed(&self, desc1: &str, desc2: &str) -> DetailChoice {
        let user = serde_json::json!({ "desc1": desc1, "desc2": desc2 }).to_string();
        match self
            .chain
            .first_accepted("compare", COMPARE_SYSTEM_PROMPT, &user, parse_choice)
        {
            Ok(choice) => choice,
            Err(err) => {
                info!(
                    "event=detail_fallback module=reconcile status=degraded reason={}",
                    if self.chain.is_empty() { "unconfigured" } else { "exhausted" }
                );
                debug!("event=detail_fallback module=reconcile detail={err}");
                LengthPreference.pick_more_detailed(desc1, desc2)
            }
        }
    }
}

fn parse_choice(value: Value) -> Option<DetailChoice> {
    let choice = match value.get("more_detailed")?.as_str()?.trim() {
        "desc1" => Choice::Desc1,
        "desc2" => Choice::Desc2,
        _ => return None,
    };
    let reason = value
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(DetailChoice { choice, reason })
}
