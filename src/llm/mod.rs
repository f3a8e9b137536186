//! LLM: provider adapter behind the assessment client.
//!
//! `LlmClient` picks Anthropic or an `OpenAI`-compatible endpoint from
//! `LLM_PROVIDER` and implements [`LlmChat`], the only LLM surface the
//! assessor sees. The provider key stays inside this module.

pub mod anthropic;
pub mod config;
pub mod openai;
pub mod tools;
pub mod types;

use std::time::Duration;

use config::{LlmConfig, LlmProviderKind, LlmTimeouts};
pub use types::LlmChat;
use types::{Completion, LlmError, Prompt};

pub struct LlmClient {
    backend: Backend,
    model: String,
}

enum Backend {
    Anthropic(anthropic::AnthropicClient),
    OpenAi(openai::OpenAiClient),
}

impl LlmClient {
    /// # Errors
    ///
    /// Returns an error if the API key is missing, a setting is invalid or
    /// the HTTP client fails to build.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_config(LlmConfig::from_env()?)
    }

    /// # Errors
    ///
    /// Returns an error if the provider HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let backend = match config.provider {
            LlmProviderKind::Anthropic => Backend::Anthropic(anthropic::AnthropicClient::new(config.api_key, config.timeouts)?),
            LlmProviderKind::OpenAi => Backend::OpenAi(openai::OpenAiClient::new(
                config.api_key,
                config.openai_mode,
                config.openai_base_url,
                config.timeouts,
            )?),
        };
        Ok(Self { backend, model: config.model })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    async fn complete(&self, prompt: &Prompt<'_>) -> Result<Completion, LlmError> {
        match &self.backend {
            Backend::Anthropic(c) => c.complete(&self.model, prompt).await,
            Backend::OpenAi(c) => c.complete(&self.model, prompt).await,
        }
    }
}

// =============================================================================
// SHARED HTTP
// =============================================================================

fn http_client(timeouts: LlmTimeouts) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
        .map_err(|e| LlmError::HttpClientBuild(e.to_string()))
}

/// Read the body, failing with the status on anything but 2xx.
async fn success_body(response: reqwest::Response) -> Result<String, LlmError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
    if !status.is_success() {
        return Err(LlmError::ApiResponse { status: status.as_u16(), body });
    }
    Ok(body)
}
