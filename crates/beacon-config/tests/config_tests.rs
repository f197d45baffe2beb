// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Beacon configuration system.

use beacon_config::diagnostic::ConfigError;
use beacon_config::model::BeaconConfig;
use beacon_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_beacon_config() {
    let toml = r#"
[delivery]
max_batch = 50
max_concurrent_senders = 4
max_retry_attempts = 3
coordinator_delay_ms = 100
sender_timeout_ms = 5000

[gateway]
url = "http://127.0.0.1:9000/push"
access_token = "tok"
request_timeout_secs = 4

[storage]
database_path = "/tmp/beacon-test.db"
wal_mode = false

[runner]
poll_interval_ms = 200
drain_timeout_secs = 3
task_retention_secs = 60

[log]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.delivery.max_batch, 50);
    assert_eq!(config.delivery.max_concurrent_senders, 4);
    assert_eq!(config.delivery.max_retry_attempts, 3);
    assert_eq!(config.delivery.coordinator_delay_ms, 100);
    assert_eq!(config.delivery.sender_timeout_ms, 5000);
    assert_eq!(config.gateway.url, "http://127.0.0.1:9000/push");
    assert_eq!(config.gateway.access_token.as_deref(), Some("tok"));
    assert_eq!(config.gateway.request_timeout_secs, 4);
    assert_eq!(config.storage.database_path, "/tmp/beacon-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.runner.poll_interval_ms, 200);
    assert_eq!(config.log.level, "debug");
}

/// A misspelled key yields an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_key_suggests_correction() {
    let toml = r#"
[delivery]
max_btach = 10
"#;

    let errors = load_and_validate_str(toml).unwrap_err();
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "max_btach" && s == "max_batch"
        )
    });
    assert!(found, "expected a suggestion for max_btach, got {errors:?}");
}

/// An unknown section is rejected at the top level.
#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[metrics]\nenabled = true\n").unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::UnknownKey { key, .. } if key == "metrics")));
}

/// Wrong value types produce InvalidType diagnostics naming the key.
#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[delivery]\nmax_batch = \"many\"\n").unwrap_err();
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::InvalidType { key, .. } if key.contains("max_batch")
    )));
}

/// Semantic validation runs after successful deserialization.
#[test]
fn semantic_validation_runs_after_parse() {
    let errors = load_and_validate_str("[delivery]\nmax_batch = 500\n").unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("max_batch"))));
}

/// Dotted overrides reach keys containing underscores.
#[test]
fn dotted_override_reaches_underscored_key() {
    use figment::{providers::Serialized, Figment};

    let config: BeaconConfig = Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(("delivery.max_concurrent_senders", 3))
        .extract()
        .expect("should set max_concurrent_senders via dot notation");

    assert_eq!(config.delivery.max_concurrent_senders, 3);
}

/// Missing config files are silently skipped.
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: BeaconConfig = Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(Toml::file("/nonexistent/path/beacon.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.delivery.max_batch, 100);
}

/// An empty document validates to the compiled defaults.
#[test]
fn empty_document_yields_defaults() {
    let config = load_and_validate_str("").expect("defaults are valid");
    assert_eq!(config.delivery.max_retry_attempts, 5);
    assert_eq!(config.runner.drain_timeout_secs, 30);
}
