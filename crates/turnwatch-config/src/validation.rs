// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as positive thresholds and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::TurnwatchConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TurnwatchConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    let positive_secs = [
        ("tracker.turn_timeout_secs", config.tracker.turn_timeout_secs),
        (
            "tracker.escalation_threshold_secs",
            config.tracker.escalation_threshold_secs,
        ),
        (
            "tracker.slow_response_threshold_secs",
            config.tracker.slow_response_threshold_secs,
        ),
        ("tracker.overdue_batch_size", config.tracker.overdue_batch_size),
    ];
    for (name, value) in positive_secs {
        if value <= 0 {
            errors.push(ConfigError::Validation {
                message: format!("{name} must be positive, got {value}"),
            });
        }
    }

    if config.tracker.scan_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "tracker.scan_interval_secs must be positive, got 0".to_string(),
        });
    }

    if config.tracker.summary_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "tracker.summary_interval_secs must be positive, got 0".to_string(),
        });
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "service.log_level must be one of {valid_levels:?}, got `{}`",
                config.service.log_level
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = TurnwatchConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = TurnwatchConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn non_positive_thresholds_fail_validation() {
        let mut config = TurnwatchConfig::default();
        config.tracker.turn_timeout_secs = 0;
        config.tracker.escalation_threshold_secs = -5;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn bogus_log_level_fails_validation() {
        let mut config = TurnwatchConfig::default();
        config.service.log_level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("log_level"))
        ));
    }

    #[test]
    fn collects_all_errors_without_failing_fast() {
        let mut config = TurnwatchConfig::default();
        config.storage.database_path = " ".to_string();
        config.tracker.scan_interval_secs = 0;
        config.service.log_level = "silent".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
