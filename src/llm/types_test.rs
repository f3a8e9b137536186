use super::*;
use crate::error::ErrorCode;

fn tool() -> Tool {
    Tool { name: "submit_questions".into(), description: "d".into(), input_schema: serde_json::json!({}) }
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(LlmError::ConfigParse("bad".into()).error_code(), "E_CONFIG_PARSE");
    assert_eq!(LlmError::MissingApiKey { var: "KEY".into() }.error_code(), "E_MISSING_API_KEY");
    assert_eq!(LlmError::ApiRequest("timeout".into()).error_code(), "E_API_REQUEST");
    assert_eq!(LlmError::ApiResponse { status: 500, body: String::new() }.error_code(), "E_API_RESPONSE");
    assert_eq!(LlmError::ApiParse("json".into()).error_code(), "E_API_PARSE");
    assert_eq!(LlmError::HttpClientBuild("tls".into()).error_code(), "E_HTTP_CLIENT_BUILD");
}

#[test]
fn overload_and_transport_failures_are_retryable() {
    assert!(LlmError::ApiRequest("conn refused".into()).retryable());
    assert!(LlmError::ApiResponse { status: 429, body: String::new() }.retryable());
    assert!(LlmError::ApiResponse { status: 529, body: String::new() }.retryable());
    assert!(!LlmError::ApiResponse { status: 401, body: String::new() }.retryable());
    assert!(!LlmError::ApiParse("x".into()).retryable());
    assert!(!LlmError::MissingApiKey { var: "K".into() }.retryable());
}

#[test]
fn api_response_display_hides_provider_body() {
    let err = LlmError::ApiResponse { status: 401, body: "invalid x-api-key sk-123".into() };
    assert_eq!(err.to_string(), "API response error: status 401");
}

#[test]
fn prompt_with_tool_keeps_text_fields() {
    let t = tool();
    let prompt = Prompt::text("sys", "Alter: 34", 512).with_tool(&t);
    assert_eq!(prompt.system, "sys");
    assert_eq!(prompt.user, "Alter: 34");
    assert_eq!(prompt.max_tokens, 512);
    assert_eq!(prompt.tool_name(), Some("submit_questions"));
    assert_eq!(Prompt::text("s", "u", 1).tool_name(), None);
}

#[test]
fn finish_prefers_tool_call_over_truncation() {
    assert_eq!(Finish::from_flags(true, true), Finish::ToolCall);
    assert_eq!(Finish::from_flags(false, true), Finish::Truncated);
    assert_eq!(Finish::from_flags(false, false), Finish::Complete);
    assert_eq!(Finish::Truncated.to_string(), "truncated");
}
