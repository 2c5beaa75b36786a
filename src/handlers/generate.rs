use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GenerationError;
use crate::llm::media::resolve_upload_mime_type;
use crate::pipeline::types::{
    parse_platforms, CaptionPolicy, CreativeHints, Format, GenerationRequest, GenerationResponse,
    ImageProvenance, ProfileContext, ReferenceImage,
};
use crate::state::AppState;
use crate::utils::timing::{complete_request_timer, start_request_timer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Multipart,
    Unsupported,
}

impl BodyKind {
    fn of(request: &Request) -> Self {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if content_type.starts_with("application/json") {
            BodyKind::Json
        } else if content_type.starts_with("multipart/form-data") {
            BodyKind::Multipart
        } else {
            BodyKind::Unsupported
        }
    }

    fn mode_label(&self) -> &'static str {
        match self {
            BodyKind::Json => "text_only",
            BodyKind::Multipart => "image_conditioned",
            BodyKind::Unsupported => "unknown",
        }
    }
}

/// JSON body of a text-only generation request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateJsonBody {
    pub user_text: String,
    pub tone: Vec<String>,
    pub visual_style: Vec<String>,
    pub niche: Option<String>,
    pub sub_niche: Option<String>,
    pub image_description: Option<String>,
    pub style: Option<String>,
    pub mood: Option<String>,
    pub format: Option<String>,
    pub platforms: Vec<String>,
    pub caption: Option<String>,
}

impl GenerateJsonBody {
    fn into_request(self) -> Result<GenerationRequest, GenerationError> {
        let mut request = GenerationRequest::text_only(self.user_text);
        request.format = parse_format(self.format.as_deref())?;
        request.platforms =
            parse_platforms(&self.platforms.join(",")).map_err(GenerationError::InvalidInput)?;
        request.profile = ProfileContext {
            tone: self.tone,
            visual_style: self.visual_style,
            niche: self.niche,
            sub_niche: self.sub_niche,
        };
        request.hints = CreativeHints {
            image_description: self.image_description,
            style: self.style,
            mood: self.mood,
        };
        if let Some(caption) = self.caption {
            request.captions = parse_caption(&caption)?;
        }
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponseBody {
    pub master_prompt: String,
    pub image_url: String,
    pub image_source: ImageProvenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<GenerationResponse> for GenerateResponseBody {
    fn from(response: GenerationResponse) -> Self {
        GenerateResponseBody {
            image_url: response.image.to_url(),
            image_source: response.image.provenance,
            master_prompt: response.master_prompt,
            caption: response.caption,
            warning: response.warning,
        }
    }
}

fn parse_format(value: Option<&str>) -> Result<Format, GenerationError> {
    value
        .unwrap_or_default()
        .parse::<Format>()
        .map_err(GenerationError::InvalidInput)
}

fn parse_caption(value: &str) -> Result<CaptionPolicy, GenerationError> {
    value.parse::<CaptionPolicy>().map_err(GenerationError::InvalidInput)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn multipart_error(err: MultipartError, limit: usize) -> GenerationError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GenerationError::FileTooLarge { size: None, limit }
    } else {
        GenerationError::InvalidInput(err.body_text())
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    limit: usize,
) -> Result<GenerationRequest, GenerationError> {
    let mut user_text = String::new();
    let mut file: Option<ReferenceImage> = None;
    let mut format = None;
    let mut platforms = None;
    let mut caption = None;
    let mut profile = ProfileContext::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().map(str::to_string);
            let declared = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|err| multipart_error(err, limit))?;
            if bytes.is_empty() {
                continue;
            }
            let mime_type = resolve_upload_mime_type(declared.as_deref(), &bytes);
            file = Some(ReferenceImage {
                bytes: bytes.to_vec(),
                mime_type,
                file_name,
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|err| multipart_error(err, limit))?;
        match name.as_str() {
            "user_text" => user_text = value,
            "format" => format = Some(value),
            "platforms" => platforms = Some(value),
            "caption" => caption = Some(value),
            "tone" => profile.tone = split_csv(&value),
            "visual_style" => profile.visual_style = split_csv(&value),
            "niche" => profile.niche = non_blank(value),
            "sub_niche" => profile.sub_niche = non_blank(value),
            other => debug!("Ignoring unknown form field {other:?}."),
        }
    }

    let mut request = GenerationRequest::image_conditioned(user_text, file);
    request.format = parse_format(format.as_deref())?;
    if let Some(platforms) = platforms {
        request.platforms = parse_platforms(&platforms).map_err(GenerationError::InvalidInput)?;
    }
    if let Some(caption) = caption {
        request.captions = parse_caption(&caption)?;
    }
    request.profile = profile;
    Ok(request)
}

async fn parse_request(
    state: &AppState,
    kind: BodyKind,
    request: Request,
) -> Result<GenerationRequest, GenerationError> {
    match kind {
        BodyKind::Json => {
            let Json(body) = Json::<GenerateJsonBody>::from_request(request, state)
                .await
                .map_err(|rejection| GenerationError::InvalidInput(rejection.body_text()))?;
            body.into_request()
        }
        BodyKind::Multipart => {
            let multipart = Multipart::from_request(request, state)
                .await
                .map_err(|rejection| GenerationError::InvalidInput(rejection.body_text()))?;
            read_multipart(multipart, state.orchestrator.max_upload_bytes()).await
        }
        BodyKind::Unsupported => Err(GenerationError::UnsupportedMediaType(
            "Content-Type must be application/json or multipart/form-data".to_string(),
        )),
    }
}

/// POST /api/v1/generate (also mounted at /api/generate)
///
/// JSON bodies run text-only generation; multipart bodies carry a reference
/// photo and run image-conditioned generation.
pub async fn generate(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<GenerateResponseBody>, GenerationError> {
    let kind = BodyKind::of(&request);
    let route = request.uri().path().to_string();

    let parsed = parse_request(&state, kind, request).await;
    let user_text = parsed
        .as_ref()
        .ok()
        .map(|generation| generation.user_text.as_str());
    let mut timer = start_request_timer(&route, kind.mode_label(), user_text);

    let result = match parsed {
        Ok(generation) => state.orchestrator.run(generation).await,
        Err(err) => Err(err),
    };

    match &result {
        Ok(response) => {
            let status = match response.warning {
                Some(_) => "success_with_warning",
                None => "success",
            };
            complete_request_timer(&mut timer, status, None);
        }
        Err(err) => complete_request_timer(
            &mut timer,
            "error",
            Some(format!("{} {err}", err.status().as_u16())),
        ),
    }

    result.map(|response| Json(response.into()))
}
