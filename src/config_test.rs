//! Tests for environment configuration
//!
//! Uses `init_from_hashmap` rather than mutating the process environment,
//! which would race with other tests running in parallel.

use super::*;
use std::collections::HashMap;

fn config_from(pairs: &[(&str, &str)]) -> Config {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::init_from_hashmap(&env).expect("config should load")
}

#[test]
fn test_defaults_when_nothing_is_set() {
    let config = config_from(&[]);

    assert_eq!(config.bind(), "0.0.0.0:8000");
    assert_eq!(config.environment, "development");
    assert_eq!(config.pod_id, "unknown");
    assert_eq!(config.database_url(), None);
    assert_eq!(config.redis_url(), None);
    assert_eq!(config.metrics_token(), None);
    assert_eq!(config.dep_timeout.0, Duration::from_millis(1500));
    assert_eq!(config.shutdown_grace.0, Duration::from_secs(40));
    assert_eq!(config.prestop_delay.0, Duration::from_secs(8));
    assert!(!config.trace_http);
    assert_eq!(config.log_format, LogFormat::Json);
}

#[test]
fn test_overrides_are_applied() {
    let config = config_from(&[
        ("BIND_PORT", "9100"),
        ("ENVIRONMENT", "production"),
        ("POD_ID", "api-7f9c"),
        ("DATABASE_URL", "postgres://localhost/app"),
        ("REDIS_URL", "redis://localhost:6379"),
        ("METRICS_TOKEN", "s3cret"),
        ("DEP_TIMEOUT_SECONDS", "0.25"),
        ("SHUTDOWN_GRACE_SECONDS", "5"),
        ("LOG_FORMAT", "pretty"),
    ]);

    assert_eq!(config.bind(), "0.0.0.0:9100");
    assert_eq!(config.environment, "production");
    assert_eq!(config.pod_id, "api-7f9c");
    assert_eq!(config.database_url(), Some("postgres://localhost/app"));
    assert_eq!(config.redis_url(), Some("redis://localhost:6379"));
    assert_eq!(config.metrics_token(), Some("s3cret"));
    assert_eq!(config.dep_timeout.0, Duration::from_millis(250));
    assert_eq!(config.shutdown_grace.0, Duration::from_secs(5));
    assert_eq!(config.log_format, LogFormat::Pretty);
}

/// Exported-but-empty variables must not enable a dependency
#[test]
fn test_empty_optional_values_count_as_unset() {
    let config = config_from(&[("DATABASE_URL", ""), ("METRICS_TOKEN", "  ")]);

    assert_eq!(config.database_url(), None);
    assert_eq!(config.metrics_token(), None);
}

#[test]
fn test_metrics_token_keeps_padding() {
    let config = config_from(&[("METRICS_TOKEN", " s3cret ")]);

    assert_eq!(config.metrics_token(), Some(" s3cret "));
}

#[test]
fn test_env_secs_duration_parsing() {
    assert_eq!(
        "1.5".parse::<EnvSecsDuration>(),
        Ok(EnvSecsDuration(Duration::from_millis(1500)))
    );
    assert_eq!(
        "0".parse::<EnvSecsDuration>(),
        Ok(EnvSecsDuration(Duration::ZERO))
    );
    assert!("-1".parse::<EnvSecsDuration>().is_err());
    assert!("soon".parse::<EnvSecsDuration>().is_err());
}

#[test]
fn test_invalid_duration_fails_config_load() {
    let env = HashMap::from([("SHUTDOWN_GRACE_SECONDS".to_string(), "forever".to_string())]);
    assert!(Config::init_from_hashmap(&env).is_err());
}
