//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values. Every section is `#[serde(default)]`,
//! so a partial JSON file only overrides the keys it names.

use serde::{Deserialize, Serialize};

use crate::loader::folio_home;

/// Root settings type for the Folio assistant.
///
/// ```json
/// {
///   "llm": { "model": "gpt-4.1-mini" },
///   "engine": { "maxAttempts": 2 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FolioSettings {
    /// Settings schema version.
    pub version: String,
    /// Language-model connection settings.
    pub llm: LlmSettings,
    /// Mutation engine behavior.
    pub engine: EngineSettings,
    /// Persistence settings.
    pub store: StoreSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for FolioSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            llm: LlmSettings::default(),
            engine: EngineSettings::default(),
            store: StoreSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Language-model connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    /// Provider family. Only `"openai"` (and compatible endpoints) is wired.
    pub provider: String,
    /// Model id sent with each request.
    pub model: String,
    /// Base URL of the chat-completions API.
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Sampling temperature; omitted from requests when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Ask the provider for a JSON-object response format.
    pub json_response_format: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-5.1".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_ms: 30_000,
            temperature: None,
            json_response_format: false,
        }
    }
}

/// Mutation engine behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Model attempts per user turn before the turn fails.
    pub max_attempts: u32,
    /// Activity entries per project included in the model context.
    pub context_activity_limit: usize,
    /// Author recorded on comments created by the assistant.
    pub default_author: String,
    /// Conversation messages kept and replayed to the model.
    pub history_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            context_activity_limit: 3,
            default_author: "AI Assistant".to_string(),
            history_limit: 20,
        }
    }
}

/// Persistence settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Path of the `SQLite` database file.
    pub db_path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// Insert demo projects into an empty database on startup.
    pub seed_demo: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: folio_home().join("portfolio.db").to_string_lossy().into_owned(),
            pool_size: 4,
            seed_demo: false,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
