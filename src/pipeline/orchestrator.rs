use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, FEATHERLESS_API_KEY, GEMINI_API_KEY};
use crate::error::GenerationError;
use crate::llm::{ChatCompletion, CompletionError, ImageSynthesis, SamplingConfig, SynthesisOutcome};
use crate::pipeline::caption::caption_for;
use crate::pipeline::prompt_architect::build_messages;
use crate::pipeline::style::{analyze_style, StyleProfile};
use crate::pipeline::types::{
    CaptionPolicy, GenerationMode, GenerationRequest, GenerationResponse, ImageResult, Platform,
};

pub const IMAGE_FALLBACK_WARNING: &str = "Image generation failed, returning original image";
pub const CAPTION_FAILED_WARNING: &str = "Caption generation failed; caption omitted";

/// Immutable knobs the orchestrator needs from the service configuration.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub prompt_sampling: SamplingConfig,
    pub caption_sampling: SamplingConfig,
    pub style_sampling: SamplingConfig,
    pub max_upload_bytes: usize,
    pub text_credentials: bool,
    pub image_credentials: bool,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        OrchestratorSettings {
            prompt_sampling: SamplingConfig::new(config.prompt_temperature, config.prompt_max_tokens),
            caption_sampling: SamplingConfig::new(
                config.caption_temperature,
                config.caption_max_tokens,
            ),
            style_sampling: SamplingConfig::new(config.style_temperature, config.style_max_tokens),
            max_upload_bytes: config.max_upload_bytes,
            text_credentials: config.has_text_credentials(),
            image_credentials: config.has_image_credentials(),
        }
    }
}

/// Runs one generation request: validate, write the master prompt (and the
/// caption alongside it), synthesize the image, then merge the results.
pub struct Orchestrator {
    completion: Arc<dyn ChatCompletion>,
    images: Arc<dyn ImageSynthesis>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        completion: Arc<dyn ChatCompletion>,
        images: Arc<dyn ImageSynthesis>,
        settings: OrchestratorSettings,
    ) -> Self {
        Orchestrator {
            completion,
            images,
            settings,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.settings.max_upload_bytes
    }

    fn validate(&self, request: &GenerationRequest) -> Result<(), GenerationError> {
        if request.user_text.trim().is_empty() {
            return Err(GenerationError::MissingField("user_text"));
        }

        if request.mode == GenerationMode::ImageConditioned {
            let image = match &request.reference_image {
                Some(image) if !image.is_empty() => image,
                _ => return Err(GenerationError::MissingField("file")),
            };
            if image.len() > self.settings.max_upload_bytes {
                return Err(GenerationError::FileTooLarge {
                    size: Some(image.len()),
                    limit: self.settings.max_upload_bytes,
                });
            }
        }

        if !self.settings.text_credentials {
            return Err(GenerationError::NotConfigured(FEATHERLESS_API_KEY));
        }
        if request.mode == GenerationMode::ImageConditioned && !self.settings.image_credentials {
            return Err(GenerationError::NotConfigured(GEMINI_API_KEY));
        }
        Ok(())
    }

    async fn master_prompt(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let (system_message, user_message) = build_messages(request);
        let prompt = self
            .completion
            .complete(&system_message, &user_message, self.settings.prompt_sampling)
            .await
            .map_err(GenerationError::PromptGeneration)?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::PromptGeneration(CompletionError::EmptyContent));
        }
        Ok(prompt.to_string())
    }

    async fn caption(&self, request: &GenerationRequest) -> Result<String, CompletionError> {
        let caption = caption_for(
            self.completion.as_ref(),
            &request.user_text,
            request.format,
            &request.platforms,
            self.settings.caption_sampling,
        )
        .await?;
        let caption = caption.trim();
        if caption.is_empty() {
            return Err(CompletionError::EmptyContent);
        }
        Ok(caption.to_string())
    }

    pub async fn run(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.validate(&request)?;

        let mut warnings: Vec<String> = Vec::new();

        let (master_prompt, caption) = match request.captions {
            CaptionPolicy::None => (self.master_prompt(&request).await?, None),
            CaptionPolicy::Optional => {
                let (prompt, caption) =
                    tokio::join!(self.master_prompt(&request), self.caption(&request));
                let prompt = prompt?;
                let caption = match caption {
                    Ok(caption) => Some(caption),
                    Err(err) => {
                        warn!(error = %err, "Caption generation failed; continuing without it.");
                        warnings.push(CAPTION_FAILED_WARNING.to_string());
                        None
                    }
                };
                (prompt, caption)
            }
            CaptionPolicy::Required => {
                let (prompt, caption) = tokio::try_join!(self.master_prompt(&request), async {
                    self.caption(&request)
                        .await
                        .map_err(GenerationError::CaptionGeneration)
                })?;
                (prompt, Some(caption))
            }
        };
        info!(
            model = self.completion.model(),
            mode = request.mode.as_str(),
            platforms = ?request.platforms.iter().map(Platform::as_str).collect::<Vec<_>>(),
            prompt_chars = master_prompt.chars().count(),
            caption_requested = request.captions.is_requested(),
            caption = caption.is_some(),
            "Master prompt ready."
        );

        let outcome = self
            .images
            .synthesize(&master_prompt, request.reference_image.as_ref(), request.format)
            .await;
        info!(outcome = outcome.label(), "Image synthesis finished.");

        let image = match outcome {
            SynthesisOutcome::Generated(image) => image,
            SynthesisOutcome::NoImage(reason) | SynthesisOutcome::Failed(reason) => {
                match request.reference_image.as_ref() {
                    Some(reference) => {
                        warn!(reason = %reason, "Falling back to the uploaded image.");
                        warnings.push(IMAGE_FALLBACK_WARNING.to_string());
                        ImageResult::fallback(reference)
                    }
                    None => {
                        warn!(reason = %reason, "Image synthesis failed with nothing to fall back on.");
                        return Err(GenerationError::ImageGeneration(reason));
                    }
                }
            }
        };

        Ok(GenerationResponse {
            master_prompt,
            image,
            caption,
            warning: (!warnings.is_empty()).then(|| warnings.join("; ")),
        })
    }

    pub async fn analyze_style(
        &self,
        samples: Vec<String>,
    ) -> Result<StyleProfile, GenerationError> {
        let samples: Vec<String> = samples
            .into_iter()
            .map(|sample| sample.trim().to_string())
            .filter(|sample| !sample.is_empty())
            .collect();
        if samples.is_empty() {
            return Err(GenerationError::MissingField("text_samples"));
        }
        if !self.settings.text_credentials {
            return Err(GenerationError::NotConfigured(FEATHERLESS_API_KEY));
        }
        analyze_style(self.completion.as_ref(), &samples, self.settings.style_sampling)
            .await
            .map_err(GenerationError::StyleAnalysis)
    }
}
