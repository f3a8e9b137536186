//! Service configuration parsed from environment variables.
//!
//! LLM provider settings live in [`crate::llm::config`]; rate limits in
//! [`crate::rate_limit`]. Everything here has a default, so a missing
//! variable never stops the service from starting.

use std::time::Duration;

use crate::flow::FlowVariant;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_QUESTION_COUNT: usize = 8;
pub const DEFAULT_AI_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_LEAD_SOURCE: &str = "allergie-check";
pub const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 3600;
pub const DEFAULT_SESSION_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Flow used for sessions that do not request one explicitly.
    pub default_variant: FlowVariant,
    /// Number of questions requested from the model.
    pub question_count: usize,
    pub ai_max_tokens: u32,
    /// Lead-collection webhook. `None` logs leads instead of sending them.
    pub lead_webhook_url: Option<String>,
    pub lead_source: String,
    /// Sessions untouched for this long are evicted.
    pub session_idle_ttl: Duration,
    pub session_sweep_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            default_variant: FlowVariant::WithEmail,
            question_count: DEFAULT_QUESTION_COUNT,
            ai_max_tokens: DEFAULT_AI_MAX_TOKENS,
            lead_webhook_url: None,
            lead_source: DEFAULT_LEAD_SOURCE.into(),
            session_idle_ttl: Duration::from_secs(DEFAULT_SESSION_IDLE_TTL_SECS),
            session_sweep_interval: Duration::from_secs(DEFAULT_SESSION_SWEEP_INTERVAL_SECS),
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// - `PORT` (3000)
    /// - `FLOW_VARIANT`: `with_email` (default) or `three_step`
    /// - `QUESTION_COUNT` (8, clamped to 1..=20)
    /// - `AI_MAX_TOKENS` (4096)
    /// - `LEAD_WEBHOOK_URL` (unset)
    /// - `LEAD_SOURCE` (`allergie-check`)
    /// - `SESSION_IDLE_TTL_SECS` (3600)
    /// - `SESSION_SWEEP_INTERVAL_SECS` (60, at least 1)
    #[must_use]
    pub fn from_env() -> Self {
        let default_variant = match std::env::var("FLOW_VARIANT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "unknown FLOW_VARIANT, using with_email");
                FlowVariant::WithEmail
            }),
            Err(_) => FlowVariant::WithEmail,
        };

        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            default_variant,
            question_count: env_parse("QUESTION_COUNT", DEFAULT_QUESTION_COUNT).clamp(1, 20),
            ai_max_tokens: env_parse("AI_MAX_TOKENS", DEFAULT_AI_MAX_TOKENS),
            lead_webhook_url: non_empty_env("LEAD_WEBHOOK_URL"),
            lead_source: non_empty_env("LEAD_SOURCE").unwrap_or_else(|| DEFAULT_LEAD_SOURCE.into()),
            session_idle_ttl: Duration::from_secs(env_parse("SESSION_IDLE_TTL_SECS", DEFAULT_SESSION_IDLE_TTL_SECS)),
            session_sweep_interval: Duration::from_secs(
                env_parse("SESSION_SWEEP_INTERVAL_SECS", DEFAULT_SESSION_SWEEP_INTERVAL_SECS).max(1),
            ),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
