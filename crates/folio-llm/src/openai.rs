//! `OpenAI`-compatible chat-completions client implementing [`ChatModel`].
//!
//! Sends a single non-streaming `POST {base_url}/chat/completions` and
//! returns `choices[0].message.content`. Works against `OpenAI` and any
//! proxy or local server speaking the same wire format.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::provider::{ChatModel, CompletionOptions, ProviderError, ProviderResult};
use crate::types::ChatMessage;

/// Default `OpenAI` API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Fallback delay when a 429 carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

/// Connection settings for [`OpenAiChatModel`].
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API base URL without trailing slash.
    pub base_url: String,
    /// Bearer token. Requests are rejected locally when absent.
    pub api_key: Option<String>,
    /// Model id.
    pub model: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: "gpt-5.1".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat model backed by an `OpenAI`-compatible HTTP endpoint.
pub struct OpenAiChatModel {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiChatModel {
    /// Build a client with the configured timeout.
    pub fn new(config: OpenAiConfig) -> ProviderResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn headers(&self) -> ProviderResult<HeaderMap> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::Auth {
                message: "no API key configured".to_string(),
            })?;

        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer =
            HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| ProviderError::Auth {
                message: format!("invalid API key header: {e}"),
            })?;
        let _ = headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }
}

/// Map a non-success HTTP response to a [`ProviderError`].
fn error_for_status(status: reqwest::StatusCode, retry_after: Option<&str>, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::Auth {
            message: format!("{status}: {body}"),
        },
        429 => ProviderError::RateLimited {
            retry_after_ms: retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map_or(DEFAULT_RETRY_AFTER_MS, |secs| secs * 1000),
            message: body,
        },
        code => ProviderError::Api {
            status: code,
            message: body,
            retryable: status.is_server_error(),
        },
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> ProviderResult<String> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_response.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        debug!(model = %self.config.model, messages = messages.len(), "sending chat completion");

        let response = self
            .client
            .post(self.endpoint())
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "chat completion rejected");
            return Err(error_for_status(status, retry_after.as_deref(), text));
        }

        let bytes = response.bytes().await?;
        let parsed: ChatCompletionResponse = serde_json::from_slice(&bytes)?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Other {
                message: "chat completion contained no choices".to_string(),
            })?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config_for(server: &MockServer) -> OpenAiConfig {
        OpenAiConfig {
            base_url: format!("{}/v1", server.uri()),
            api_key: Some("sk-test".to_string()),
            model: "gpt-test".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-test",
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "hi there"}}]
            })))
            .mount(&server)
            .await;

        let model = OpenAiChatModel::new(config_for(&server)).unwrap();
        let reply = model
            .complete(&[ChatMessage::user("hello")], &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "hi there");
    }

    #[tokio::test]
    async fn sends_json_response_format_when_requested() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "response_format": {"type": "json_object"},
                "temperature": 0.2
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "{}"}}]
            })))
            .mount(&server)
            .await;

        let model = OpenAiChatModel::new(config_for(&server)).unwrap();
        let options = CompletionOptions {
            temperature: Some(0.2),
            json_response: true,
            ..Default::default()
        };
        let reply = model.complete(&[ChatMessage::user("x")], &options).await.unwrap();
        assert_eq!(reply, "{}");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let model = OpenAiChatModel::new(config_for(&server)).unwrap();
        let err = model
            .complete(&[ChatMessage::user("x")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert_matches!(err, ProviderError::Auth { .. });
        assert!(err.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn rate_limit_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "7")
                    .set_body_string("slow down"),
            )
            .mount(&server)
            .await;

        let model = OpenAiChatModel::new(config_for(&server)).unwrap();
        let err = model
            .complete(&[ChatMessage::user("x")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert_matches!(err, ProviderError::RateLimited { retry_after_ms: 7000, .. });
    }

    #[tokio::test]
    async fn server_error_is_retryable_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let model = OpenAiChatModel::new(config_for(&server)).unwrap();
        let err = model
            .complete(&[ChatMessage::user("x")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_matches!(err, ProviderError::Api { status: 503, .. });
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let model = OpenAiChatModel::new(config_for(&server)).unwrap();
        let err = model
            .complete(&[ChatMessage::user("x")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert_matches!(err, ProviderError::Other { .. });
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_sending() {
        let config = OpenAiConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let model = OpenAiChatModel::new(config).unwrap();
        let err = model
            .complete(&[ChatMessage::user("x")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert_matches!(err, ProviderError::Auth { .. });
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let model = OpenAiChatModel::new(OpenAiConfig {
            base_url: "http://localhost:8000/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(model.endpoint(), "http://localhost:8000/v1/chat/completions");
        assert_eq!(model.model(), "gpt-5.1");
    }
}
