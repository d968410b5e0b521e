//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`FolioSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `FOLIO_*` environment variable overrides (highest priority)
//! 4. Validate cross-field constraints
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::FolioSettings;

/// Upper bound for `engine.maxAttempts`.
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

/// Resolve the Folio home directory (`~/.folio`).
pub fn folio_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".folio")
}

/// Resolve the path to the settings file (`~/.folio/settings.json`).
pub fn settings_path() -> PathBuf {
    folio_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<FolioSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON or an out-of-range value
/// is an error.
pub fn load_settings_from_path(path: &Path) -> Result<FolioSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Read and merge a settings file without consulting the environment.
pub fn read_settings_file(path: &Path) -> Result<FolioSettings> {
    let defaults = serde_json::to_value(FolioSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
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

/// Check constraints serde cannot express.
pub fn validate(settings: &FolioSettings) -> Result<()> {
    let attempts = settings.engine.max_attempts;
    if attempts == 0 || attempts > MAX_ATTEMPTS_LIMIT {
        return Err(SettingsError::InvalidValue(format!(
            "engine.maxAttempts must be between 1 and {MAX_ATTEMPTS_LIMIT}, got {attempts}"
        )));
    }
    if settings.store.pool_size == 0 {
        return Err(SettingsError::InvalidValue(
            "store.poolSize must be at least 1".to_string(),
        ));
    }
    if let Some(t) = settings.llm.temperature {
        if !(0.0..=2.0).contains(&t) {
            return Err(SettingsError::InvalidValue(format!(
                "llm.temperature must be within 0.0..=2.0, got {t}"
            )));
        }
    }
    Ok(())
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (file/default value stays).
pub fn apply_env_overrides(settings: &mut FolioSettings) {
    // ── LLM ─────────────────────────────────────────────────────────
    if let Some(v) = read_env_string("FOLIO_LLM_MODEL") {
        settings.llm.model = v;
    }
    if let Some(v) = read_env_string("FOLIO_LLM_BASE_URL") {
        settings.llm.base_url = v;
    }

    // ── Engine ──────────────────────────────────────────────────────
    if let Some(v) = read_env_u32("FOLIO_MAX_ATTEMPTS", 1, MAX_ATTEMPTS_LIMIT) {
        settings.engine.max_attempts = v;
    }

    // ── Store ───────────────────────────────────────────────────────
    if let Some(v) = read_env_string("FOLIO_DB_PATH") {
        settings.store.db_path = v;
    }
    if let Some(v) = read_env_bool("FOLIO_SEED_DEMO") {
        settings.store.seed_demo = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("FOLIO_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_bool("FOLIO_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within an inclusive range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid integer env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
