use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, llm};
use tabrank_config::LlmProviderConfig;

/// Page text beyond this many characters is not sent to the model.
pub const MAX_TEXT_CHARS: usize = 2_000;

const SYSTEM_PROMPT: &str = "You summarize browser tabs for a tab search engine. \
Output must be valid JSON only and must match the provided schema exactly. \
For every page write a factual summary of at most 500 characters and up to 30 short, \
lowercase topical tags. Use only information present in the page. \
Do not add explanations or extra fields.";

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRequestItem<'a> {
	#[serde(rename = "ref")]
	pub reference: &'a str,
	pub title: &'a str,
	pub url: &'a str,
	pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SummaryItem {
	#[serde(rename = "ref")]
	pub reference: String,
	#[serde(default)]
	pub summary: String,
	#[serde(default)]
	pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
	summaries: Vec<SummaryItem>,
}

pub fn response_schema() -> Value {
	serde_json::json!({
		"type": "object",
		"properties": {
			"summaries": {
				"type": "array",
				"items": {
					"type": "object",
					"properties": {
						"ref": { "type": "string" },
						"summary": { "type": "string" },
						"tags": { "type": "array", "items": { "type": "string" } }
					},
					"required": ["ref", "summary", "tags"]
				}
			}
		},
		"required": ["summaries"]
	})
}

pub fn build_messages(items: &[SummaryRequestItem<'_>]) -> Vec<Value> {
	let mut user_prompt = String::from(
		"Return JSON of the form {\"summaries\": [{\"ref\": string, \"summary\": string, \"tags\": [string]}]} with one entry per page.\nPages:\n",
	);

	for item in items {
		let text: String = item.text.chars().take(MAX_TEXT_CHARS).collect();

		user_prompt.push_str(&format!(
			"\n[{reference}]\nTitle: {title}\nURL: {url}\nContent: {text}\n",
			reference = item.reference,
			title = item.title,
			url = item.url,
			text = text.trim(),
		));
	}

	llm::build_messages(SYSTEM_PROMPT, &user_prompt)
}

pub fn parse_summaries(raw: &str) -> Result<Vec<SummaryItem>> {
	let value = llm::parse_json_payload(raw)?;
	let payload: SummaryPayload = serde_json::from_value(value)?;

	Ok(payload.summaries)
}

pub async fn summarize(
	cfg: &LlmProviderConfig,
	items: &[SummaryRequestItem<'_>],
) -> Result<Vec<SummaryItem>> {
	if items.is_empty() {
		return Ok(Vec::new());
	}

	let messages = build_messages(items);
	let schema = response_schema();
	let raw = llm::complete(cfg, &messages, Some(&schema)).await?;

	parse_summaries(&raw)
}
