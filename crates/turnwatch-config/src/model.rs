// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for turnwatch.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so unrecognized config
//! keys are rejected at startup with an actionable diagnostic.

use serde::{Deserialize, Serialize};

/// Top-level turnwatch configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; only `telegram.bot_token` is required to actually serve.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TurnwatchConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Telegram transport settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Turn-tracking thresholds and task scheduling.
    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "turnwatch".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram transport configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables the Telegram transport.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Chat id of the operator channel. Receives escalations and alerts,
    /// and gates `/teamstats` and the roster commands (`/add_employee`,
    /// `/remove_employee`).
    #[serde(default)]
    pub admin_chat_id: Option<i64>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "turnwatch.db".to_string()
}

/// Turn-tracking thresholds and background task scheduling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Maximum gap between partner messages before a new turn replaces the
    /// prior one instead of extending it.
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: i64,

    /// Minimum turn age before an escalation reminder is eligible to fire.
    #[serde(default = "default_escalation_threshold_secs")]
    pub escalation_threshold_secs: i64,

    /// Response duration above which a slow-response alert is emitted.
    #[serde(default = "default_slow_response_threshold_secs")]
    pub slow_response_threshold_secs: i64,

    /// Whether to emit slow-response alerts at all.
    #[serde(default = "default_slow_response_alerts")]
    pub slow_response_alerts: bool,

    /// Interval between escalation scanner runs.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Interval between daily aggregator runs.
    #[serde(default = "default_summary_interval_secs")]
    pub summary_interval_secs: u64,

    /// Pause between consecutive escalation notifications, respecting
    /// transport throughput limits.
    #[serde(default = "default_notify_pause_ms")]
    pub notify_pause_ms: u64,

    /// Maximum overdue turns fetched per scan batch.
    #[serde(default = "default_overdue_batch_size")]
    pub overdue_batch_size: i64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            turn_timeout_secs: default_turn_timeout_secs(),
            escalation_threshold_secs: default_escalation_threshold_secs(),
            slow_response_threshold_secs: default_slow_response_threshold_secs(),
            slow_response_alerts: default_slow_response_alerts(),
            scan_interval_secs: default_scan_interval_secs(),
            summary_interval_secs: default_summary_interval_secs(),
            notify_pause_ms: default_notify_pause_ms(),
            overdue_batch_size: default_overdue_batch_size(),
        }
    }
}

fn default_turn_timeout_secs() -> i64 {
    3_600 // 1 hour
}

fn default_escalation_threshold_secs() -> i64 {
    14_400 // 4 hours
}

fn default_slow_response_threshold_secs() -> i64 {
    7_200 // 2 hours
}

fn default_slow_response_alerts() -> bool {
    true
}

fn default_scan_interval_secs() -> u64 {
    1_800 // 30 minutes
}

fn default_summary_interval_secs() -> u64 {
    86_400 // daily
}

fn default_notify_pause_ms() -> u64 {
    500
}

fn default_overdue_batch_size() -> i64 {
    100
}
