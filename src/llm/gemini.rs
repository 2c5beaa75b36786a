use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::llm::extract::extract_image;
use crate::llm::image::SynthesisOutcome;
use crate::pipeline::types::{Format, ImageResult, ReferenceImage};
use crate::utils::http::{summarize_error_body, truncate_for_log};
use crate::utils::timing::log_llm_timing;

#[derive(Debug, thiserror::Error)]
enum GeminiCallError {
    #[error("{0}")]
    Transport(String),
    #[error("image backend returned status {status}: {detail}")]
    Rejected { status: StatusCode, detail: String },
    #[error("image backend response was not valid JSON: {0}")]
    Malformed(String),
    #[error("no image found in image backend response")]
    NoImage,
}

/// Image-conditioned generation through Gemini `generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiImageClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    send_aspect_ratio: bool,
}

impl GeminiImageClient {
    pub fn new(
        http: Client,
        base_url: &str,
        api_key: &str,
        model: &str,
        send_aspect_ratio: bool,
    ) -> Self {
        GeminiImageClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            send_aspect_ratio,
        }
    }

    pub fn build_payload(&self, prompt: &str, image: &ReferenceImage, format: Format) -> Value {
        let mut generation_config = Map::new();
        generation_config.insert("responseModalities".to_string(), json!(["TEXT", "IMAGE"]));
        if self.send_aspect_ratio {
            generation_config.insert(
                "imageConfig".to_string(),
                json!({ "aspectRatio": format.aspect_ratio() }),
            );
        }

        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    { "inlineData": { "mimeType": image.mime_type, "data": image.to_base64() } }
                ]
            }],
            "generationConfig": Value::Object(generation_config),
        })
    }

    async fn call_api(&self, payload: &Value) -> Result<ImageResult, GeminiCallError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| GeminiCallError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GeminiCallError::Transport(err.to_string()))?;

        if !status.is_success() {
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            return Err(GeminiCallError::Rejected {
                status,
                detail: message.unwrap_or(body_summary),
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|err| GeminiCallError::Malformed(err.to_string()))?;

        match extract_image(&value) {
            Some((strategy, image)) => {
                debug!(
                    target: "llm.gemini",
                    strategy = strategy.name(),
                    mime_type = %image.mime_type,
                    data_len = image.data.len(),
                    "image extracted"
                );
                Ok(ImageResult::generated_inline(image.mime_type, image.data))
            }
            None => {
                warn!(
                    "No image in Gemini response: {}",
                    truncate_for_log(&value.to_string(), 1000)
                );
                Err(GeminiCallError::NoImage)
            }
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        image: &ReferenceImage,
        format: Format,
    ) -> SynthesisOutcome {
        if self.api_key.is_empty() {
            return SynthesisOutcome::Failed(format!(
                "{} is not configured",
                crate::config::GEMINI_API_KEY
            ));
        }

        let payload = self.build_payload(prompt, image, format);
        let metadata = json!({
            "format": format.as_str(),
            "reference_mime_type": image.mime_type,
            "reference_bytes": image.len(),
        });

        let result = log_llm_timing("gemini", &self.model, "image_generation", Some(metadata), || {
            self.call_api(&payload)
        })
        .await;

        match result {
            Ok(image) => SynthesisOutcome::Generated(image),
            Err(GeminiCallError::Transport(detail)) => {
                warn!("Gemini image request failed to send: {}", detail);
                SynthesisOutcome::Failed(format!("image request failed: {detail}"))
            }
            Err(other) => SynthesisOutcome::NoImage(other.to_string()),
        }
    }
}
