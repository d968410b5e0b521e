//! # Chat Model Trait
//!
//! Core abstraction for the language-model collaborator. The engine only
//! needs one capability: send an ordered message list, get back the raw
//! reply text. Transport concerns (auth, timeouts, HTTP status handling)
//! stay behind [`ChatModel`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::ChatMessage;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while talking to the model.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication failed (missing or rejected API key).
    #[error("Auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// Rate limited by the provider.
    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested retry delay in milliseconds.
        retry_after_ms: u64,
        /// Error description.
        message: String,
    },

    /// Provider returned an API error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Whether this error can be retried.
        retryable: bool,
    },

    /// Provider-specific error.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl ProviderError {
    /// Whether the transport considers this error transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            Self::RateLimited { .. } => true,
            Self::Api { retryable, .. } => *retryable,
            Self::Auth { .. } | Self::Json(_) | Self::Other { .. } => false,
        }
    }

    /// Error category string for logging.
    pub fn category(&self) -> &str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) => "parse",
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limit",
            Self::Api { .. } => "api",
            Self::Other { .. } => "unknown",
        }
    }
}

/// Options for a single completion request.
///
/// All fields are optional; providers use their own defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    /// Sampling temperature (0.0 - 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Request a JSON-object response format where supported.
    #[serde(default)]
    pub json_response: bool,
}

/// Language-model collaborator.
///
/// Implementors must be `Send + Sync` so a session can hold them behind an
/// `Arc`. A call either returns the full reply text or a [`ProviderError`];
/// there is no streaming and no internal retry.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model id used for requests (e.g. `"gpt-5.1"`).
    fn model(&self) -> &str;

    /// Send the message list and return the assistant's raw reply.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> ProviderResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(
            ProviderError::RateLimited {
                retry_after_ms: 1000,
                message: "slow down".into()
            }
            .is_retryable()
        );
        assert!(
            ProviderError::Api {
                status: 503,
                message: "overloaded".into(),
                retryable: true
            }
            .is_retryable()
        );
        assert!(
            !ProviderError::Auth {
                message: "no key".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn categories() {
        assert_eq!(
            ProviderError::Auth {
                message: String::new()
            }
            .category(),
            "auth"
        );
        assert_eq!(
            ProviderError::Other {
                message: String::new()
            }
            .category(),
            "unknown"
        );
    }

    #[test]
    fn options_omit_unset_fields() {
        let v = serde_json::to_value(CompletionOptions::default()).unwrap();
        assert!(v.get("temperature").is_none());
        assert_eq!(v["jsonResponse"], false);
    }
}
