// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./turnwatch.toml` > `~/.config/turnwatch/turnwatch.toml`
//! > `/etc/turnwatch/turnwatch.toml`, with environment variable overrides via
//! the `TURNWATCH_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without a wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TurnwatchConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/turnwatch/turnwatch.toml` (system-wide)
/// 3. `~/.config/turnwatch/turnwatch.toml` (user XDG config)
/// 4. `./turnwatch.toml` (local directory)
/// 5. `TURNWATCH_*` environment variables
pub fn load_config() -> Result<TurnwatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TurnwatchConfig::default()))
        .merge(Toml::file("/etc/turnwatch/turnwatch.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("turnwatch/turnwatch.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("turnwatch.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and for loading an explicit config string.
pub fn load_config_from_str(toml_content: &str) -> Result<TurnwatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TurnwatchConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TurnwatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TurnwatchConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `TURNWATCH_TELEGRAM_BOT_TOKEN` must map
/// to `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("TURNWATCH_").map(|key| {
        // `key` keeps the env var's original casing with the prefix
        // stripped, e.g. TURNWATCH_TRACKER_TURN_TIMEOUT_SECS comes through
        // as "TRACKER_TURN_TIMEOUT_SECS".
        let mapped = key
            .as_str()
            .to_ascii_lowercase()
            .replacen("service_", "service.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("tracker_", "tracker.", 1);
        mapped.into()
    })
}
