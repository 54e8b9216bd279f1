//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TopoliveSettings::default()`]
//! 2. If `~/.topolive/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `TOPOLIVE_*` environment variable overrides (highest priority)
//! 4. [`TopoliveSettings::validate`] corrects zero intervals
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::TopoliveSettings;

pub const ENV_URL: &str = "TOPOLIVE_URL";
pub const ENV_RECONNECT_DELAY_MS: &str = "TOPOLIVE_RECONNECT_DELAY_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "TOPOLIVE_POLL_INTERVAL_MS";
pub const ENV_LOG_LEVEL: &str = "TOPOLIVE_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "TOPOLIVE_LOG_JSON";

/// Resolve the path to the settings file (`~/.topolive/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".topolive").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TopoliveSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<TopoliveSettings> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

/// Same as [`load_settings_from_path`] with an explicit variable lookup.
pub fn load_settings_with<F>(path: &Path, lookup: F) -> Result<TopoliveSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(TopoliveSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: TopoliveSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
    settings.validate();
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut TopoliveSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are logged and ignored (the file/default value stays).
pub fn apply_overrides<F>(settings: &mut TopoliveSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read(ENV_URL) {
        settings.server.url = v;
    }
    if let Some(v) = read(ENV_RECONNECT_DELAY_MS) {
        match parse_u64_range(&v, 1, 600_000) {
            Some(ms) => settings.session.reconnect_delay_ms = ms,
            None => warn_invalid(ENV_RECONNECT_DELAY_MS, &v),
        }
    }
    if let Some(v) = read(ENV_POLL_INTERVAL_MS) {
        match parse_u64_range(&v, 1, 3_600_000) {
            Some(ms) => settings.session.poll_interval_ms = ms,
            None => warn_invalid(ENV_POLL_INTERVAL_MS, &v),
        }
    }
    if let Some(v) = read(ENV_LOG_LEVEL) {
        settings.logging.level = v;
    }
    if let Some(v) = read(ENV_LOG_JSON) {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => warn_invalid(ENV_LOG_JSON, &v),
        }
    }
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "invalid env var, ignoring");
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
