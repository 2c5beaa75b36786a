use async_trait::async_trait;

use crate::llm::gemini::GeminiImageClient;
use crate::llm::pollinations::PollinationsClient;
use crate::pipeline::types::{Format, ImageResult, ReferenceImage};

/// What one image-synthesis attempt produced.
///
/// `NoImage` means the backend answered but nothing usable came back
/// (non-success status, blocked or malformed response). `Failed` means the
/// call itself never completed. Neither is raised as an error; the caller
/// decides whether to fall back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    Generated(ImageResult),
    NoImage(String),
    Failed(String),
}

impl SynthesisOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SynthesisOutcome::Generated(_) => "generated",
            SynthesisOutcome::NoImage(_) => "no_image",
            SynthesisOutcome::Failed(_) => "failed",
        }
    }
}

#[async_trait]
pub trait ImageSynthesis: Send + Sync {
    /// Text-to-image when `reference` is `None`, image-conditioned otherwise.
    async fn synthesize(
        &self,
        prompt: &str,
        reference: Option<&ReferenceImage>,
        format: Format,
    ) -> SynthesisOutcome;
}

/// Routes text-only requests to the URL template backend and
/// image-conditioned requests to the multimodal backend.
#[derive(Debug, Clone)]
pub struct ImageSynthesizer {
    text_to_image: PollinationsClient,
    image_conditioned: GeminiImageClient,
}

impl ImageSynthesizer {
    pub fn new(text_to_image: PollinationsClient, image_conditioned: GeminiImageClient) -> Self {
        ImageSynthesizer {
            text_to_image,
            image_conditioned,
        }
    }
}

#[async_trait]
impl ImageSynthesis for ImageSynthesizer {
    async fn synthesize(
        &self,
        prompt: &str,
        reference: Option<&ReferenceImage>,
        format: Format,
    ) -> SynthesisOutcome {
        match reference {
            Some(image) => self.image_conditioned.generate(prompt, image, format).await,
            None => self.text_to_image.generate(prompt, format).await,
        }
    }
}
