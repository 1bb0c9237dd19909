// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Ticketrail configuration system.

use ticketrail_config::diagnostic::ConfigError;
use ticketrail_config::model::{MissingDatePolicy, TicketrailConfig};
use ticketrail_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// A TOML document touching every section deserializes with the given values.
#[test]
fn valid_toml_deserializes_into_ticketrail_config() {
    let toml = r#"
[service]
name = "tracker-test"
log_level = "debug"

[storage]
output_dir = "/tmp/ticketrail-test"
attentions_subdir = "interactions"

[registry]
max_closed_sessions = 8
max_retained_messages = 50
max_template_sends = 4

[closure]
previous_state_names = ["atendimento humano"]
previous_state_id_prefixes = ["desk"]
actions = ["survey", "nps"]

[dates]
candidate_fields = ["storageDate", "date"]
missing_date_policy = "empty"

[transcript]
separator = " | "

[campaign]
attribution_window_hours = 72

[consolidation]
max_files = 500
read_concurrency = 2
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "tracker-test");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(
        config.storage.attentions_dir(),
        std::path::PathBuf::from("/tmp/ticketrail-test/interactions")
    );
    assert_eq!(
        config.storage.raw_dir(),
        std::path::PathBuf::from("/tmp/ticketrail-test/raw")
    );
    assert_eq!(config.registry.max_closed_sessions, 8);
    assert_eq!(config.closure.actions, vec!["survey", "nps"]);
    assert_eq!(config.dates.candidate_fields, vec!["storageDate", "date"]);
    assert_eq!(config.dates.missing_date_policy, MissingDatePolicy::Empty);
    assert_eq!(config.transcript.separator, " | ");
    assert_eq!(config.campaign.attribution_window_hours, 72);
    assert_eq!(config.consolidation.max_files, Some(500));
    assert_eq!(config.consolidation.read_concurrency, 2);
}

/// An empty document yields the compiled defaults.
#[test]
fn empty_toml_yields_defaults() {
    let config = load_config_from_str("").expect("empty TOML should load");
    let defaults = TicketrailConfig::default();
    assert_eq!(config.storage.output_dir, defaults.storage.output_dir);
    assert_eq!(config.dates.missing_date_policy, MissingDatePolicy::Today);
    assert_eq!(config.campaign.attribution_window_hours, 24);
    assert_eq!(config.transcript.separator, "\\n");
    assert_eq!(
        config.classifier.session_content_type,
        "application/vnd.iris.ticket+json"
    );
}

/// A misspelled key becomes an UnknownKey diagnostic with a suggestion.
#[test]
fn typo_produces_unknown_key_with_suggestion() {
    let toml = r#"
[campaign]
atribution_window_hours = 12
"#;

    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "atribution_window_hours" && s == "attribution_window_hours"
        )
    });
    assert!(found, "expected an UnknownKey suggestion, got: {errors:?}");
}

/// An unknown section is rejected.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[webhooks]
url = "https://example.com"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// A wrong value type is reported as a diagnostic rather than a panic.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[registry]
max_closed_sessions = "many"
"#;
    let errors = load_and_validate_str(toml).expect_err("string limit should fail");
    assert!(!errors.is_empty());
}

/// An unknown missing-date policy is rejected.
#[test]
fn unknown_missing_date_policy_is_rejected() {
    let toml = r#"
[dates]
missing_date_policy = "yesterday"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_errors_are_collected() {
    let toml = r#"
[storage]
output_dir = ""

[consolidation]
read_concurrency = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("validation should fail");
    assert_eq!(errors.len(), 2);
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

/// An explicit config file is loaded and environment variables still override it.
#[test]
fn explicit_path_with_env_override() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
[storage]
output_dir = "/srv/ticketrail"

[service]
log_level = "warn"
"#,
        )?;
        jail.set_env("TICKETRAIL_SERVICE_LOG_LEVEL", "debug");

        let config = load_and_validate_path(std::path::Path::new("custom.toml"))
            .expect("explicit file should load");
        assert_eq!(config.storage.output_dir, "/srv/ticketrail");
        assert_eq!(config.service.log_level, "debug");
        Ok(())
    });
}
