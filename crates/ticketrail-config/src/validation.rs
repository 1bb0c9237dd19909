// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, non-empty trigger tables, and positive limits.

use crate::diagnostic::ConfigError;
use crate::model::TicketrailConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TicketrailConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.to_lowercase().as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "service.log_level `{}` must be one of {}",
                config.service.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.output_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.output_dir must not be empty".to_string(),
        });
    }

    let subdirs = [
        ("storage.attentions_subdir", &config.storage.attentions_subdir),
        ("storage.raw_subdir", &config.storage.raw_subdir),
        ("storage.merged_subdir", &config.storage.merged_subdir),
    ];
    for (key, value) in subdirs {
        if value.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        }
    }
    // Raw exports are enumerated per kind; sharing a directory with the
    // per-interaction files would mix schemas during consolidation.
    if config.storage.attentions_subdir == config.storage.raw_subdir
        || config.storage.attentions_subdir == config.storage.merged_subdir
    {
        errors.push(ConfigError::Validation {
            message: "storage.attentions_subdir must differ from raw_subdir and merged_subdir"
                .to_string(),
        });
    }

    let tables = [
        ("closure.previous_state_names", &config.closure.previous_state_names),
        ("closure.previous_state_id_prefixes", &config.closure.previous_state_id_prefixes),
        ("closure.actions", &config.closure.actions),
    ];
    for (key, values) in tables {
        if values.iter().any(|v| v.trim().is_empty()) {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not contain empty entries"),
            });
        }
    }

    if config.classifier.session_content_type.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "classifier.session_content_type must not be empty".to_string(),
        });
    }

    if config.dates.candidate_fields.is_empty() {
        errors.push(ConfigError::Validation {
            message: "dates.candidate_fields must list at least one field".to_string(),
        });
    }

    if config.registry.max_closed_sessions == 0 {
        errors.push(ConfigError::Validation {
            message: "registry.max_closed_sessions must be at least 1".to_string(),
        });
    }

    if config.registry.idle_contact_hours == 0 {
        errors.push(ConfigError::Validation {
            message: "registry.idle_contact_hours must be at least 1".to_string(),
        });
    }

    if config.registry.idle_sweep_every == 0 {
        errors.push(ConfigError::Validation {
            message: "registry.idle_sweep_every must be at least 1".to_string(),
        });
    }

    if config.consolidation.read_concurrency == 0 {
        errors.push(ConfigError::Validation {
            message: "consolidation.read_concurrency must be at least 1".to_string(),
        });
    }

    if config.consolidation.max_files == Some(0) {
        errors.push(ConfigError::Validation {
            message: "consolidation.max_files must be at least 1 when set".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = TicketrailConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_output_dir_fails_validation() {
        let mut config = TicketrailConfig::default();
        config.storage.output_dir = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "output_dir"));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = TicketrailConfig::default();
        config.service.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "log_level"));
    }

    #[test]
    fn shared_attentions_and_raw_dirs_fail_validation() {
        let mut config = TicketrailConfig::default();
        config.storage.raw_subdir = config.storage.attentions_subdir.clone();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "attentions_subdir"));
    }

    #[test]
    fn empty_trigger_entry_fails_validation() {
        let mut config = TicketrailConfig::default();
        config.closure.actions.push(String::new());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "closure.actions"));
    }

    #[test]
    fn zero_limits_fail_validation() {
        let mut config = TicketrailConfig::default();
        config.consolidation.max_files = Some(0);
        config.consolidation.read_concurrency = 0;
        config.registry.max_closed_sessions = 0;
        config.registry.idle_contact_hours = 0;
        config.registry.idle_sweep_every = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(has_message(&errors, "idle_contact_hours"));
    }

    #[test]
    fn empty_candidate_fields_fail_validation() {
        let mut config = TicketrailConfig::default();
        config.dates.candidate_fields.clear();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "candidate_fields"));
    }

    #[test]
    fn closure_tables_deserialize_from_toml() {
        let toml_str = r#"
[closure]
previous_state_names = ["atención humana"]
previous_state_id_prefixes = ["desk", "humano"]
actions = ["survey", "nps"]
"#;
        let config: TicketrailConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.closure.previous_state_names, vec!["atención humana"]);
        assert_eq!(config.closure.previous_state_id_prefixes, vec!["desk", "humano"]);
        assert_eq!(config.closure.actions, vec!["survey", "nps"]);
    }

    #[test]
    fn closure_deny_unknown_fields() {
        let toml_str = r#"
[closure]
trigers = ["survey"]
"#;
        assert!(toml::from_str::<TicketrailConfig>(toml_str).is_err());
    }
}
