use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::llm::completion::{ChatCompletion, CompletionError, SamplingConfig};
use crate::utils::http::{summarize_error_body, truncate_for_log};
use crate::utils::timing::log_llm_timing;

static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*<think>.*?</think>").expect("think block pattern is valid")
});

/// OpenAI-compatible chat-completion client (Featherless by default).
#[derive(Debug, Clone)]
pub struct FeatherlessClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl FeatherlessClient {
    pub fn new(http: Client, base_url: &str, api_key: &str, model: &str) -> Self {
        FeatherlessClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
        }
    }

    async fn call_api(&self, payload: &Value) -> Result<Value, CompletionError> {
        debug!(
            "Featherless request: model={}, messages={}",
            self.model,
            payload
                .get("messages")
                .and_then(|v| v.as_array())
                .map(|messages| messages.len())
                .unwrap_or(0)
        );

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| CompletionError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!(
                "Featherless API error: status={}, body={}",
                status, body_summary
            );
            return Err(CompletionError::Status {
                status,
                detail: message.unwrap_or(body_summary),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| CompletionError::Decode(err.to_string()))
    }
}

fn strip_reasoning(content: &str) -> &str {
    match THINK_BLOCK.find(content) {
        Some(found) => &content[found.end()..],
        None => content,
    }
}

/// Reads `choices[0].message.content`, accepting either a plain string or an
/// array of text parts.
pub(crate) fn extract_message_content(response: &Value) -> String {
    let content = response.pointer("/choices/0/message/content");
    let raw = match content {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(|v| v.as_str()))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    };
    strip_reasoning(&raw).trim().to_string()
}

#[async_trait]
impl ChatCompletion for FeatherlessClient {
    fn provider(&self) -> &str {
        "featherless"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system_message: &str,
        user_message: &str,
        sampling: SamplingConfig,
    ) -> Result<String, CompletionError> {
        if self.api_key.is_empty() {
            return Err(CompletionError::NotConfigured(crate::config::FEATHERLESS_API_KEY));
        }

        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_message },
                { "role": "user", "content": user_message },
            ],
            "temperature": sampling.temperature,
            "max_tokens": sampling.max_tokens,
        });
        let metadata = json!({
            "temperature": sampling.temperature,
            "max_tokens": sampling.max_tokens,
        });

        log_llm_timing(
            self.provider(),
            &self.model,
            "chat_completion",
            Some(metadata),
            || async {
                let response = self.call_api(&payload).await?;
                let content = extract_message_content(&response);
                if content.is_empty() {
                    warn!(
                        "Featherless response had empty content: {}",
                        truncate_for_log(&response.to_string(), 2000)
                    );
                    return Err(CompletionError::EmptyContent);
                }
                Ok(content)
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: &str) -> FeatherlessClient {
        let http = crate::utils::http::build_http_client(Duration::from_secs(5)).unwrap();
        FeatherlessClient::new(http, &format!("{}/v1/", server.uri()), api_key, "test-model")
    }

    #[test]
    fn extracts_string_and_part_content() {
        let plain = json!({ "choices": [{ "message": { "content": "  a red fox \n" } }] });
        assert_eq!(extract_message_content(&plain), "a red fox");

        let parts = json!({ "choices": [{ "message": { "content": [
            { "type": "text", "text": "misty " },
            { "type": "text", "text": "forest" }
        ] } }] });
        assert_eq!(extract_message_content(&parts), "misty forest");

        assert_eq!(extract_message_content(&json!({ "choices": [] })), "");
    }

    #[test]
    fn strips_leading_reasoning_block() {
        let value = json!({ "choices": [{ "message": {
            "content": "<think>\nplan the shot\n</think>\n\nGolden hour portrait"
        } }] });
        assert_eq!(extract_message_content(&value), "Golden hour portrait");
    }

    #[tokio::test]
    async fn sends_one_system_and_one_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer rc_test"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "max_tokens": 400,
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "usr" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": " Sunset over peaks " } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "rc_test");
        let result = client
            .complete("sys", "usr", SamplingConfig::new(0.7, 400))
            .await
            .unwrap();
        assert_eq!(result, "Sunset over peaks");
    }

    #[tokio::test]
    async fn empty_content_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "   " } }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, "rc_test")
            .complete("sys", "usr", SamplingConfig::new(0.7, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::EmptyContent));
    }

    #[tokio::test]
    async fn non_success_status_carries_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "invalid api key" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, "rc_bad")
            .complete("sys", "usr", SamplingConfig::new(0.7, 10))
            .await
            .unwrap_err();
        match err {
            CompletionError::Status { status, detail } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(detail, "invalid api key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server, " ")
            .complete("sys", "usr", SamplingConfig::new(0.7, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::NotConfigured("FEATHERLESS_API_KEY")));
    }
}
