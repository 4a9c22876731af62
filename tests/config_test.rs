use std::time::Duration;

use jobmarket::config::Config;
use jobmarket::error::Error;

#[test]
fn defaults_are_usable() {
    let config = Config::default();
    assert_eq!(config.log_level, "info");
    assert_eq!(config.service_name, "jobmarket");
    assert!(config.otel_endpoint.is_none());
    assert!(config.event_buffer > 0);
}

#[test]
fn toml_overrides_defaults() {
    let config = Config::from_toml_str(
        r#"
        log_level = "debug"
        event_buffer = 16
        connect_max_retries = 1
        connect_backoff_ms = 20
        "#,
    )
    .unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.event_buffer, 16);
    assert_eq!(config.event_journal, Config::default().event_journal);

    let engine = config.engine_config();
    assert_eq!(engine.event_buffer, 16);
    assert_eq!(engine.reconnect.max_retries, 1);
    assert_eq!(engine.reconnect.backoff, Duration::from_millis(20));
}

#[test]
fn toml_rejects_unknown_keys() {
    let err = Config::from_toml_str("database_url = \"postgres://x\"").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

// Env-driven cases share one test: the process environment is global and
// tests run in parallel.
#[test]
fn environment_overrides_and_validation() {
    unsafe {
        std::env::set_var("JOBMARKET_EVENT_JOURNAL", "32");
        std::env::set_var("JOBMARKET_SERVICE_NAME", "jobmarket-test");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.event_journal, 32);
    assert_eq!(config.service_name, "jobmarket-test");

    unsafe {
        std::env::set_var("JOBMARKET_EVENT_JOURNAL", "lots");
    }
    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    unsafe {
        std::env::remove_var("JOBMARKET_EVENT_JOURNAL");
        std::env::set_var("JOBMARKET_EVENT_BUFFER", "0");
    }
    assert!(Config::from_env().is_err());

    unsafe {
        std::env::remove_var("JOBMARKET_EVENT_BUFFER");
        std::env::remove_var("JOBMARKET_SERVICE_NAME");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.event_buffer, Config::default().event_buffer);
    assert_eq!(config.service_name, "jobmarket");
}
