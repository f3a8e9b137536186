//! Anthropic Messages API client (`/v1/messages`).
//!
//! A prompt with a tool is sent with `tool_choice` pinned to that tool.
//! Request building and response parsing are pure functions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::LlmTimeouts;
use super::types::{Completion, Finish, LlmError, Prompt, Tool};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        Ok(Self { http: super::http_client(timeouts)?, api_key })
    }

    pub async fn complete(&self, model: &str, prompt: &Prompt<'_>) -> Result<Completion, LlmError> {
        let body = MessagesRequest::new(model, prompt);
        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let text = super::success_body(response).await?;
        parse_messages_response(&text, prompt.tool_name())
    }
}

// =============================================================================
// REQUEST
// =============================================================================

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserTurn<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<[&'a Tool; 1]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<PinnedTool<'a>>,
}

#[derive(Serialize)]
struct UserTurn<'a> {
    role: &'static str,
    content: &'a str,
}

/// `{"type": "tool", "name": ...}`
#[derive(Serialize)]
struct PinnedTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
}

impl<'a> MessagesRequest<'a> {
    fn new(model: &'a str, prompt: &Prompt<'a>) -> Self {
        Self {
            model,
            max_tokens: prompt.max_tokens,
            system: prompt.system,
            messages: [UserTurn { role: "user", content: prompt.user }],
            tools: prompt.tool.map(|t| [t]),
            tool_choice: prompt.tool.map(|t| PinnedTool { kind: "tool", name: &t.name }),
        }
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<Block>,
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: Usage,
}

/// Thinking and future block types fall into `Other` and are skipped.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text { text: String },
    ToolUse { name: String, input: Value },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

fn parse_messages_response(json: &str, tool: Option<&str>) -> Result<Completion, LlmError> {
    let resp: MessagesResponse = serde_json::from_str(json).map_err(|e| LlmError::ApiParse(e.to_string()))?;

    let mut text = String::new();
    let mut tool_input = None;
    for block in resp.content {
        match block {
            Block::Text { text: segment } => text.push_str(&segment),
            Block::ToolUse { name, input } if tool_input.is_none() && tool == Some(name.as_str()) => {
                tool_input = Some(input);
            }
            Block::ToolUse { .. } | Block::Other => {}
        }
    }

    let truncated = resp.stop_reason.as_deref() == Some("max_tokens");
    Ok(Completion {
        finish: Finish::from_flags(tool_input.is_some(), truncated),
        text,
        tool_input,
        model: resp.model,
        input_tokens: resp.usage.input_tokens,
        output_tokens: resp.usage.output_tokens,
    })
}

#[cfg(test)]
#[path = "anthropic_test.rs"]
mod tests;
