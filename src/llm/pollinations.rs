use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::llm::image::SynthesisOutcome;
use crate::pipeline::types::{Format, ImageResult};
use crate::utils::timing::log_llm_timing;

/// Keyless text-to-image backend addressed by a templated URL.
#[derive(Debug, Clone)]
pub struct PollinationsClient {
    http: Client,
    base_url: String,
    prefetch: bool,
}

impl PollinationsClient {
    pub fn new(http: Client, base_url: &str, prefetch: bool) -> Self {
        PollinationsClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            prefetch,
        }
    }

    /// `{base}/prompt/{percent-encoded prompt}?width=W&height=H&nologo=true`
    pub fn image_url(&self, prompt: &str, format: Format) -> Result<String, String> {
        let raw = format!(
            "{}/prompt/{}",
            self.base_url,
            urlencoding::encode(prompt.trim())
        );
        let mut url = Url::parse(&raw)
            .map_err(|err| format!("invalid image base URL {:?}: {err}", self.base_url))?;

        let (width, height) = format.dimensions();
        url.query_pairs_mut()
            .append_pair("width", &width.to_string())
            .append_pair("height", &height.to_string())
            .append_pair("nologo", "true");
        Ok(url.to_string())
    }

    pub async fn generate(&self, prompt: &str, format: Format) -> SynthesisOutcome {
        let url = match self.image_url(prompt, format) {
            Ok(url) => url,
            Err(err) => return SynthesisOutcome::Failed(err),
        };

        if !self.prefetch {
            debug!("Pollinations image URL built without prefetch");
            return SynthesisOutcome::Generated(ImageResult::generated_url(url));
        }

        let metadata = json!({ "format": format.as_str() });
        let result = log_llm_timing("pollinations", "default", "text_to_image", Some(metadata), || async {
            self.http.get(&url).send().await
        })
        .await;

        match result {
            Ok(response) if response.status().is_success() => {
                SynthesisOutcome::Generated(ImageResult::generated_url(url))
            }
            Ok(response) => {
                let status = response.status();
                warn!("Pollinations prefetch returned status {}", status);
                SynthesisOutcome::NoImage(format!("image backend returned status {status}"))
            }
            Err(err) => {
                warn!("Pollinations prefetch failed: {}", err);
                SynthesisOutcome::Failed(format!("image request failed: {err}"))
            }
        }
    }
}
