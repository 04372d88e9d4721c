//! Free text to `ExtractionPayload` through the provider chain.

use crate::llm::chain::{ChainError, ProviderChain};
use crate::model::extraction::ExtractionPayload;
use chrono::{Local, Months, NaiveDate};
use serde_json::Value;

/// Upper bound on accepted input text, in characters.
pub const MAX_EXTRACT_CHARS: usize = 2000;

pub struct Extractor {
    chain: ProviderChain,
}

impl Extractor {
    pub fn new(chain: ProviderChain) -> Self {
        Self { chain }
    }

    pub fn is_configured(&self) -> bool {
        !self.chain.is_empty()
    }

    /// Extracts with today's local date as the reference for relative time.
    pub fn extract(&self, text: &str) -> Result<ExtractionPayload, ChainError> {
        self.extract_with_reference(text, Local::now().date_naive())
    }

    /// The first answer that parses into a payload with a non-blank name wins.
    pub fn extract_with_reference(
        &self,
        text: &str,
        reference: NaiveDate,
    ) -> Result<ExtractionPayload, ChainError> {
        let system = extraction_prompt(reference);
        self.chain
            .first_accepted("extract", &system, text, parse_payload)
    }
}

fn parse_payload(value: Value) -> Option<ExtractionPayload> {
    let payload: ExtractionPayload = serde_json::from_value(value).ok()?;
    payload.validate().ok()?;
    Some(payload)
}

/// Builds the extraction instruction anchored at `reference`.
pub fn extraction_prompt(reference: NaiveDate) -> String {
    let day = |date: Option<NaiveDate>| {
        date.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    };
    let today = day(Some(reference));
    let yesterday = day(reference.pred_opt());
    let tomorrow = day(reference.succ_opt());
    let next_month = reference
        .checked_add_months(Months::new(1))
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default();

    format!(
        r#"你是一个专业的人物信息提取助手。请仔细分析用户输入的文本，按语义提取所有相关信息，并严格按照以下JSON格式输出，不要包含任何额外的解释或说明。

{{
  "profile": {{
    "name": "人物姓名（必填）",
    "job": "职业或工作内容（可选）",
    "birthday": "生日（可选，格式为MM-DD或YYYY-MM-DD）",
    "notes": ["其他备注（可选）"],
    "events": [
      {{"date": "日期（YYYY-MM-DD）", "location": "地点（可选）", "description": "事件详细描述"}}
    ]
  }},
  "annotations": [
    {{"time": "时间（YYYY-MM-DD或YYYY-MM）", "location": "地点（可选）", "description": "计划内容"}}
  ],
  "developments": [
    {{"content": "领域或方向", "type": "resource"}}
  ],
  "relations": [
    {{"name": "相关人物姓名", "relation_type": "关系类型"}}
  ]
}}

【提取规则】
1. 当前参考日期：{today}
   - "昨天" → {yesterday}
   - "今天" → {today}
   - "明天" → {tomorrow}
   - "下个月" → {next_month}（格式YYYY-MM）
2. events：只提取已经发生的事情
3. annotations：只提取未来的计划、约定或待办事项
4. developments：提取人物从事的领域、行业或专业方向
5. relations：提取文本中明确提到的与其他人物的关系
6. 没有明确提到的字段保持为null或空数组
7. 不要编造任何信息，只提取文本中明确存在的内容"#
    )
}
