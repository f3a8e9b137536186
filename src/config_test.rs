use super::*;

// Unique env var names avoid races with parallel tests.

#[test]
fn env_parse_reads_value() {
    let key = "__TEST_ENV_PARSE_OK_4411__";
    unsafe { std::env::set_var(key, " 42 ") };
    assert_eq!(env_parse(key, 7_u32), 42);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_falls_back_on_garbage() {
    let key = "__TEST_ENV_PARSE_BAD_4412__";
    unsafe { std::env::set_var(key, "lots") };
    assert_eq!(env_parse(key, 7_u32), 7);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_falls_back_when_unset() {
    assert_eq!(env_parse("__TEST_ENV_PARSE_UNSET_4413__", 3000_u16), 3000);
}

#[test]
fn non_empty_env_filters_blank() {
    let key = "__TEST_NON_EMPTY_4414__";
    unsafe { std::env::set_var(key, "   ") };
    assert_eq!(non_empty_env(key), None);
    unsafe { std::env::set_var(key, " https://hooks.example/lead ") };
    assert_eq!(non_empty_env(key).as_deref(), Some("https://hooks.example/lead"));
    unsafe { std::env::remove_var(key) };
}

#[test]
fn default_config_uses_email_flow() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.default_variant, FlowVariant::WithEmail);
    assert_eq!(cfg.question_count, DEFAULT_QUESTION_COUNT);
    assert!(cfg.lead_webhook_url.is_none());
    assert_eq!(cfg.lead_source, "allergie-check");
    assert_eq!(cfg.session_idle_ttl, Duration::from_secs(3600));
    assert_eq!(cfg.session_sweep_interval, Duration::from_secs(60));
}
