//! OpenAI-compatible client for `/chat/completions` and `/responses`.
//!
//! Any server speaking either dialect works through `LLM_OPENAI_BASE_URL`.
//! Tool arguments arrive as a JSON string; an unparsable string counts as
//! no tool call so the assessor falls back to the text.

use serde::Serialize;
use serde_json::{Value, json};

use super::config::{LlmTimeouts, OpenAiApiMode};
use super::types::{Completion, Finish, LlmError, Prompt};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    mode: OpenAiApiMode,
}

impl OpenAiClient {
    pub fn new(api_key: String, mode: OpenAiApiMode, base_url: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        Ok(Self { http: super::http_client(timeouts)?, api_key, base_url, mode })
    }

    pub async fn complete(&self, model: &str, prompt: &Prompt<'_>) -> Result<Completion, LlmError> {
        let tool = prompt.tool_name();
        match self.mode {
            OpenAiApiMode::ChatCompletions => {
                let text = self.post("/chat/completions", &chat_request(model, prompt)).await?;
                parse_chat_completion(&text, tool)
            }
            OpenAiApiMode::Responses => {
                let text = self.post("/responses", &responses_request(model, prompt)).await?;
                parse_responses_output(&text, tool)
            }
        }
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<String, LlmError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        super::success_body(response).await
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<[Value; 1]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

fn chat_request<'a>(model: &'a str, prompt: &Prompt<'_>) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if !prompt.system.trim().is_empty() {
        messages.push(json!({ "role": "system", "content": prompt.system }));
    }
    messages.push(json!({ "role": "user", "content": prompt.user }));

    ChatRequest {
        model,
        max_tokens: prompt.max_tokens,
        messages,
        tools: prompt.tool.map(|t| {
            [json!({
                "type": "function",
                "function": { "name": t.name, "description": t.description, "parameters": t.input_schema }
            })]
        }),
        tool_choice: prompt
            .tool
            .map(|t| json!({ "type": "function", "function": { "name": t.name } })),
    }
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    max_output_tokens: u32,
    instructions: &'a str,
    input: [Value; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<[Value; 1]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

fn responses_request<'a>(model: &'a str, prompt: &Prompt<'a>) -> ResponsesRequest<'a> {
    ResponsesRequest {
        model,
        max_output_tokens: prompt.max_tokens,
        instructions: prompt.system,
        input: [json!({
            "type": "message",
            "role": "user",
            "content": [{ "type": "input_text", "text": prompt.user }]
        })],
        tools: prompt.tool.map(|t| {
            [json!({
                "type": "function",
                "name": t.name,
                "description": t.description,
                "parameters": t.input_schema
            })]
        }),
        tool_choice: prompt
            .tool
            .map(|t| json!({ "type": "function", "name": t.name })),
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

fn token_count(root: &Value, key: &str) -> u64 {
    root.pointer(&format!("/usage/{key}"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

fn model_of(root: &Value) -> String {
    root.get("model")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Decode the arguments of a call when it targets `wanted`.
fn decode_arguments(name: Option<&str>, arguments: Option<&str>, wanted: Option<&str>) -> Option<Value> {
    if name.is_none() || name != wanted {
        return None;
    }
    serde_json::from_str(arguments.unwrap_or("{}")).ok()
}

pub(crate) fn parse_chat_completion(json_text: &str, tool: Option<&str>) -> Result<Completion, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let choice = root
        .pointer("/choices/0")
        .ok_or_else(|| LlmError::ApiParse("chat_completions: missing choices[0]".into()))?;

    let text = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let tool_input = choice
        .pointer("/message/tool_calls")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find_map(|call| {
            decode_arguments(
                call.pointer("/function/name").and_then(Value::as_str),
                call.pointer("/function/arguments").and_then(Value::as_str),
                tool,
            )
        });
    let truncated = choice.get("finish_reason").and_then(Value::as_str) == Some("length");

    Ok(Completion {
        finish: Finish::from_flags(tool_input.is_some(), truncated),
        text,
        tool_input,
        model: model_of(&root),
        input_tokens: token_count(&root, "prompt_tokens"),
        output_tokens: token_count(&root, "completion_tokens"),
    })
}

pub(crate) fn parse_responses_output(json_text: &str, tool: Option<&str>) -> Result<Completion, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;

    let mut text = String::new();
    let mut tool_input = None;
    let items = root.get("output").and_then(Value::as_array);
    for item in items.into_iter().flatten() {
        match item.get("type").and_then(Value::as_str) {
            Some("message") => {
                let parts = item.get("content").and_then(Value::as_array);
                for part in parts.into_iter().flatten() {
                    if matches!(part.get("type").and_then(Value::as_str), Some("output_text" | "text")) {
                        text.push_str(part.get("text").and_then(Value::as_str).unwrap_or_default());
                    }
                }
            }
            Some("function_call") if tool_input.is_none() => {
                tool_input = decode_arguments(
                    item.get("name").and_then(Value::as_str),
                    item.get("arguments").and_then(Value::as_str),
                    tool,
                );
            }
            _ => {}
        }
    }
    if items.is_none() {
        if let Some(flat) = root.get("output_text").and_then(Value::as_str) {
            text.push_str(flat);
        }
    }

    let truncated = root.pointer("/incomplete_details/reason").and_then(Value::as_str) == Some("max_output_tokens");
    Ok(Completion {
        finish: Finish::from_flags(tool_input.is_some(), truncated),
        text,
        tool_input,
        model: model_of(&root),
        input_tokens: token_count(&root, "input_tokens"),
        output_tokens: token_count(&root, "output_tokens"),
    })
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
