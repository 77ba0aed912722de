use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};
use tabrank_config::LlmProviderConfig;

pub fn build_messages(system_prompt: &str, user_prompt: &str) -> Vec<Value> {
	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

/// Sends one chat completion and returns the assistant message content.
pub async fn complete(
	cfg: &LlmProviderConfig,
	messages: &[Value],
	schema: Option<&Value>,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});

	if let Some(schema) = schema {
		body["response_format"] = serde_json::json!({
			"type": "json_schema",
			"json_schema": { "name": "response", "schema": schema },
		});
	}

	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	message_content(&json)
}

pub fn message_content(json: &Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::to_string)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Chat response is missing message content.".to_string(),
		})
}

/// Parses a JSON object out of model output, tolerating code fences and surrounding prose.
pub fn parse_json_payload(raw: &str) -> Result<Value> {
	let trimmed = strip_code_fence(raw.trim());

	if let Ok(value) = serde_json::from_str::<Value>(trimmed)
		&& value.is_object()
	{
		return Ok(value);
	}

	let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
		return Err(Error::InvalidResponse {
			message: "Model output does not contain a JSON object.".to_string(),
		});
	};

	if end < start {
		return Err(Error::InvalidResponse {
			message: "Model output does not contain a JSON object.".to_string(),
		});
	}

	Ok(serde_json::from_str(&trimmed[start..=end])?)
}

fn strip_code_fence(raw: &str) -> &str {
	let Some(rest) = raw.strip_prefix("```") else { return raw };
	let rest = rest.strip_prefix("json").unwrap_or(rest);

	rest.strip_suffix("```").unwrap_or(rest).trim()
}
