use super::*;
use std::collections::HashMap;

fn config(vars: &[(&str, &str)]) -> Result<LlmConfig, LlmError> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    LlmConfig::from_lookup(|key| map.get(key).cloned())
}

#[test]
fn key_variable_must_be_named_and_set() {
    let err = config(&[]).unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { ref var } if var == "LLM_API_KEY_ENV"));

    let err = config(&[("LLM_API_KEY_ENV", "ALLERGY_KEY"), ("ALLERGY_KEY", "  ")]).unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { ref var } if var == "ALLERGY_KEY"));
}

#[test]
fn defaults_to_anthropic() {
    let cfg = config(&[("LLM_API_KEY_ENV", "ALLERGY_KEY"), ("ALLERGY_KEY", "secret")]).unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::Anthropic);
    assert_eq!(cfg.api_key, "secret");
    assert_eq!(cfg.model, "claude-sonnet-4-5-20250929");
    assert_eq!(cfg.openai_mode, OpenAiApiMode::ChatCompletions);
    assert_eq!(cfg.openai_base_url, DEFAULT_OPENAI_BASE_URL);
    assert_eq!(
        cfg.timeouts,
        LlmTimeouts { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    );
}

#[test]
fn openai_overrides() {
    let cfg = config(&[
        ("LLM_API_KEY_ENV", "OPENAI_API_KEY"),
        ("OPENAI_API_KEY", "sk-1"),
        ("LLM_PROVIDER", "openai"),
        ("LLM_OPENAI_MODE", "responses"),
        ("LLM_OPENAI_BASE_URL", "https://example.test/v1/"),
        ("LLM_REQUEST_TIMEOUT_SECS", "42"),
        ("LLM_CONNECT_TIMEOUT_SECS", "nope"),
    ])
    .unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::OpenAi);
    assert_eq!(cfg.model, "gpt-4o");
    assert_eq!(cfg.openai_mode, OpenAiApiMode::Responses);
    assert_eq!(cfg.openai_base_url, "https://example.test/v1");
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 42, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS });
}

#[test]
fn unknown_provider_or_mode_is_config_error() {
    let err = config(&[("LLM_PROVIDER", "gemini")]).unwrap_err().to_string();
    assert!(err.contains("unknown LLM_PROVIDER: gemini"));

    let err = config(&[("LLM_OPENAI_MODE", "assistants")]).unwrap_err().to_string();
    assert!(err.contains("unsupported LLM_OPENAI_MODE"));
}

#[test]
fn debug_redacts_api_key() {
    let cfg = config(&[("LLM_API_KEY_ENV", "K"), ("K", "sk-very-secret")]).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("sk-very-secret"));
    assert!(debug.contains("<redacted>"));
}
