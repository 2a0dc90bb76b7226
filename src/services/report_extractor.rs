//! Report extraction service - business capability layer
//!
//! Turns a link dump into the list of reports of the latest quarter.
//!
//! ## Stack
//! - `async-openai` against any OpenAI-compatible endpoint (Gemini, Azure, ...)
//! - `serde_json` for the JSON array the model answers with

use anyhow::{anyhow, Result};
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::models::ExtractedReport;
use crate::utils::truncate_text;

/// Text in, reports out
#[async_trait]
pub trait ReportExtractor: Send + Sync {
    /// Model or backend name recorded in the run metadata
    fn model_name(&self) -> &str;

    async fn extract(&self, link_dump: &str) -> Result<Vec<ExtractedReport>>;
}

const SYSTEM_PROMPT: &str = "You are a financial analyst assistant. You read lists of hyperlinks \
scraped from investor-relations websites and identify quarterly financial documents.";

const EXTRACTION_PROMPT: &str = r#"Extract the documents you can find for the latest financial quarter only among these a tags.
e.g. if you have q3fy2024, q4fy2024, q1fy2025, q2fy2025, q3fy2025 and q4fy2025 then you should only return the documents for the latest financial quarter i.e. q4fy2025.
If you can't find any valid financial documents, return an empty list.

Answer with a JSON array only. Each element must be an object with these keys:
- "title": a short descriptive title of the document
- "category": one of "earnings_release", "presentation", "financial_statements", "annual_report", "quarterly_report", "transcript", "other"
- "url": the exact href of the document as given
- "year": the fiscal year as an integer, or null
- "quarter": the fiscal quarter 1-4 as an integer, or null

Links:
"#;

/// LLM-backed extractor
pub struct LlmReportExtractor {
    client: Option<Client<OpenAIConfig>>,
    model_name: String,
}

impl LlmReportExtractor {
    /// Without an API key every call fails with a precondition error
    pub fn new(config: &Config) -> Self {
        let client = config.llm_api_key.as_ref().map(|key| {
            let openai_config = OpenAIConfig::new()
                .with_api_key(key)
                .with_api_base(&config.llm_api_base_url);
            Client::with_config(openai_config)
        });

        Self {
            client,
            model_name: config.llm_model_name.clone(),
        }
    }

    async fn send_to_llm(&self, client: &Client<OpenAIConfig>, user_message: &str) -> Result<String> {
        debug!("calling LLM {} with {} chars", self.model_name, user_message.len());

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_message)
                    .build()?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.0)
            .max_tokens(4096u32)
            .build()?;

        let response = client.chat().create(request).await.map_err(|e| {
            warn!("LLM API call failed: {}", e);
            anyhow!("LLM API call failed: {}", e)
        })?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .ok_or_else(|| anyhow!("LLM returned an empty response"))
    }
}

#[async_trait]
impl ReportExtractor for LlmReportExtractor {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn extract(&self, link_dump: &str) -> Result<Vec<ExtractedReport>> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AppError::precondition("LLM_API_KEY is not set"))?;

        let prompt = format!("{}{}", EXTRACTION_PROMPT, link_dump);
        let response = self.send_to_llm(client, &prompt).await?;
        parse_reports(&response)
    }
}

/// Parse the model's answer: a JSON array, possibly inside a code fence.
///
/// Entries without a URL are dropped; years and quarters given as strings
/// are accepted.
pub fn parse_reports(response: &str) -> Result<Vec<ExtractedReport>> {
    let body = strip_code_fence(response);
    let start = body.find('[');
    let end = body.rfind(']');
    let array = match (start, end) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => return Err(anyhow!("no JSON array in LLM response: {}", truncate_text(body, 200))),
    };

    let values: Vec<JsonValue> = serde_json::from_str(array)
        .map_err(|e| anyhow!("invalid JSON in LLM response: {}", e))?;

    Ok(values
        .iter()
        .filter_map(|value| {
            let url = str_field(value, "url");
            if url.is_empty() {
                return None;
            }
            Some(ExtractedReport {
                title: str_field(value, "title"),
                category: str_field(value, "category"),
                url,
                year: int_field(value, "year").and_then(|y| i32::try_from(y).ok()),
                quarter: int_field(value, "quarter")
                    .and_then(|q| u8::try_from(q).ok())
                    .filter(|q| (1..=4).contains(q)),
            })
        })
        .collect())
}

fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

fn str_field(value: &JsonValue, key: &str) -> String {
    value
        .get(key)
        .and_then(JsonValue::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn int_field(value: &JsonValue, key: &str) -> Option<i64> {
    match value.get(key)? {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().trim_start_matches(|c: char| c == 'q' || c == 'Q').parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json_array() {
        let response = r#"```json
[
  {"title": "Q3 FY25 Earnings Release", "category": "earnings_release", "url": "https://ir.acme.com/q3.pdf", "year": 2025, "quarter": 3},
  {"title": "Q3 FY25 Slides", "category": "presentation", "url": "https://ir.acme.com/q3-slides.pdf", "year": "2025", "quarter": "Q3"},
  {"title": "No link", "category": "other", "url": ""}
]
```"#;
        let reports = parse_reports(response).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].year, Some(2025));
        assert_eq!(reports[1].quarter, Some(3));
        assert_eq!(reports[1].category, "presentation");
    }

    #[test]
    fn empty_list_is_fine() {
        assert!(parse_reports("[]").unwrap().is_empty());
        assert!(parse_reports("Here you go: []").unwrap().is_empty());
    }

    #[test]
    fn prose_without_array_is_an_error() {
        assert!(parse_reports("I could not find any documents.").is_err());
    }

    #[tokio::test]
    async fn missing_api_key_is_a_precondition_failure() {
        let extractor = LlmReportExtractor::new(&Config::default());
        let err = extractor.extract("title='x'").await.unwrap_err();
        let app_err = err.downcast_ref::<AppError>().unwrap();
        assert!(matches!(app_err, AppError::Precondition(_)));
    }
}
