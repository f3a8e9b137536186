//! Provider settings read from the environment.
//!
//! The key itself is read from whichever variable `LLM_API_KEY_ENV` names,
//! so deployments can keep their existing secret names.

use super::types::LlmError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    Anthropic,
    OpenAi,
}

impl LlmProviderKind {
    fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-5-20250929",
            Self::OpenAi => "gpt-4o",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiApiMode {
    ChatCompletions,
    Responses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    pub api_key: String,
    pub model: String,
    pub openai_mode: OpenAiApiMode,
    pub openai_base_url: String,
    pub timeouts: LlmTimeouts,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("openai_mode", &self.openai_mode)
            .field("openai_base_url", &self.openai_base_url)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl LlmConfig {
    /// Read `LLM_PROVIDER`, `LLM_API_KEY_ENV` (required), `LLM_MODEL`,
    /// `LLM_OPENAI_MODE`, `LLM_OPENAI_BASE_URL`, `LLM_REQUEST_TIMEOUT_SECS`
    /// and `LLM_CONNECT_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is missing or blank, or a value is invalid.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let provider = match var("LLM_PROVIDER").as_deref().map(str::trim) {
            None | Some("" | "anthropic") => LlmProviderKind::Anthropic,
            Some("openai") => LlmProviderKind::OpenAi,
            Some(other) => return Err(LlmError::ConfigParse(format!("unknown LLM_PROVIDER: {other}"))),
        };
        let openai_mode = parse_openai_mode(var("LLM_OPENAI_MODE").as_deref())?;

        let key_var = var("LLM_API_KEY_ENV")
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey { var: "LLM_API_KEY_ENV".into() })?;
        let api_key = var(&key_var)
            .filter(|key| !key.trim().is_empty())
            .ok_or(LlmError::MissingApiKey { var: key_var })?;

        let model = var("LLM_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_owned());
        let openai_base_url = var("LLM_OPENAI_BASE_URL")
            .map_or_else(|| DEFAULT_OPENAI_BASE_URL.to_owned(), |url| url.trim_end_matches('/').to_owned());
        let secs = |key: &str, default: u64| {
            var(key)
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };
        let timeouts = LlmTimeouts {
            request_secs: secs("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: secs("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { provider, api_key, model, openai_mode, openai_base_url, timeouts })
    }
}

fn parse_openai_mode(raw: Option<&str>) -> Result<OpenAiApiMode, LlmError> {
    match raw.map(str::trim) {
        None | Some("" | "chat_completions") => Ok(OpenAiApiMode::ChatCompletions),
        Some("responses") => Ok(OpenAiApiMode::Responses),
        Some(other) => Err(LlmError::ConfigParse(format!(
            "unsupported LLM_OPENAI_MODE '{other}' (expected 'responses' or 'chat_completions')"
        ))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
