use async_trait::async_trait;
use reqwest::StatusCode;

/// Sampling parameters for one chat-completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SamplingConfig {
    /// Clamps temperature into `[0, 1]` and forces at least one token.
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        let temperature = if temperature.is_nan() {
            0.0
        } else {
            temperature.clamp(0.0, 1.0)
        };
        SamplingConfig {
            temperature,
            max_tokens: max_tokens.max(1),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("completion request failed: {0}")]
    Transport(String),
    #[error("completion request failed with status {status}: {detail}")]
    Status { status: StatusCode, detail: String },
    #[error("completion response could not be decoded: {0}")]
    Decode(String),
    #[error("completion response had empty content")]
    EmptyContent,
}

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    /// Sends exactly one system and one user message and returns the first
    /// choice's content, trimmed. Empty content is an error.
    async fn complete(
        &self,
        system_message: &str,
        user_message: &str,
        sampling: SamplingConfig,
    ) -> Result<String, CompletionError>;
}
