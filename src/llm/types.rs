//! LLM types: provider-neutral prompt/completion shapes and errors.
//!
//! Every assessment call is a single turn: one system prompt, one user
//! message and at most one tool. When a tool is attached the provider is
//! told to call it, so structured output never depends on the model
//! choosing to.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The key variable is unset or blank. `var` names the variable, never its value.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Non-success status. The body is kept for logs but not displayed.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    #[error("API response parse failed: {0}")]
    ApiParse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::error::ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::ApiRequest(_) => true,
            Self::ApiResponse { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// =============================================================================
// TOOL
// =============================================================================

/// A function the model is asked to call with structured arguments.
///
/// Serializes as the Anthropic tool shape; the `OpenAI` client maps it to
/// its own function definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

// =============================================================================
// PROMPT / COMPLETION
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Prompt<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub max_tokens: u32,
    /// Tool the model must call. `None` asks for free text.
    pub tool: Option<&'a Tool>,
}

impl<'a> Prompt<'a> {
    #[must_use]
    pub fn text(system: &'a str, user: &'a str, max_tokens: u32) -> Self {
        Self { system, user, max_tokens, tool: None }
    }

    #[must_use]
    pub fn with_tool(self, tool: &'a Tool) -> Self {
        Self { tool: Some(tool), ..self }
    }

    pub(crate) fn tool_name(&self) -> Option<&'a str> {
        self.tool.map(|t| t.name.as_str())
    }
}

/// Why the model stopped producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Finish {
    Complete,
    ToolCall,
    Truncated,
}

impl Finish {
    pub(crate) fn from_flags(tool_called: bool, truncated: bool) -> Self {
        if tool_called {
            Self::ToolCall
        } else if truncated {
            Self::Truncated
        } else {
            Self::Complete
        }
    }
}

impl std::fmt::Display for Finish {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Complete => "complete",
            Self::ToolCall => "tool_call",
            Self::Truncated => "truncated",
        })
    }
}

/// Provider reply reduced to what the assessor reads.
#[derive(Debug, Clone)]
pub struct Completion {
    /// All text segments joined in order.
    pub text: String,
    /// Arguments of the call to the prompt's tool, if it was made.
    pub tool_input: Option<Value>,
    pub model: String,
    pub finish: Finish,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// =============================================================================
// LLM CHAT TRAIT
// =============================================================================

/// Provider-neutral completion call. Mocked in the assessor tests.
#[async_trait::async_trait]
pub trait LlmChat: Send + Sync {
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the request fails or the response is malformed.
    async fn complete(&self, prompt: &Prompt<'_>) -> Result<Completion, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
