//! Builds the chat model from settings.
//!
//! The API key is read from the environment variable named by
//! `llm.apiKeyEnv` at startup. A missing key is not fatal here: the
//! client rejects each request with an auth error, which the session
//! reports as a failed turn.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use folio_llm::{ChatModel, OpenAiChatModel, OpenAiConfig};
use folio_settings::LlmSettings;

/// Create the configured model. `lookup` resolves environment variables.
pub fn build_model(
    settings: &LlmSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn ChatModel>> {
    match settings.provider.as_str() {
        "openai" | "openai-compatible" => {}
        other => bail!("unsupported llm provider \"{other}\" (expected \"openai\")"),
    }

    let api_key = lookup(&settings.api_key_env).filter(|k| !k.trim().is_empty());
    if api_key.is_none() {
        warn!(env = %settings.api_key_env, "no API key found, model requests will fail");
    }

    let model = OpenAiChatModel::new(OpenAiConfig {
        base_url: settings.base_url.clone(),
        api_key,
        model: settings.model.clone(),
        timeout: Duration::from_millis(settings.timeout_ms),
    })
    .context("failed to build HTTP client")?;

    info!(model = %settings.model, base_url = %settings.base_url, "chat model ready");
    Ok(Arc::new(model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_openai_model() {
        let settings = LlmSettings::default();
        let model = build_model(&settings, |name| {
            (name == "OPENAI_API_KEY").then(|| "sk-test".to_string())
        })
        .unwrap();
        assert_eq!(model.model(), "gpt-5.1");
    }

    #[test]
    fn missing_key_still_builds() {
        let settings = LlmSettings {
            model: "local-model".into(),
            ..Default::default()
        };
        let model = build_model(&settings, |_| None).unwrap();
        assert_eq!(model.model(), "local-model");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let settings = LlmSettings {
            provider: "carrier-pigeon".into(),
            ..Default::default()
        };
        let err = build_model(&settings, |_| None).err().unwrap();
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
