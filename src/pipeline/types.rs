use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::llm::media::{data_uri, encode_base64};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Post,
    Story,
    Reel,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Post => "post",
            Format::Story => "story",
            Format::Reel => "reel",
        }
    }

    pub fn aspect_ratio(&self) -> &'static str {
        match self {
            Format::Post => "1:1",
            Format::Story | Format::Reel => "9:16",
        }
    }

    /// Width and height used by the text-only image template.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Format::Post => (1024, 1024),
            Format::Story | Format::Reel => (576, 1024),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "post" => Ok(Format::Post),
            "story" => Ok(Format::Story),
            "reel" => Ok(Format::Reel),
            other => Err(format!(
                "format must be one of post, story, reel (got {other:?})"
            )),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Tiktok,
    Snapchat,
    Facebook,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Snapchat => "snapchat",
            Platform::Facebook => "facebook",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::Tiktok => "TikTok",
            Platform::Snapchat => "Snapchat",
            Platform::Facebook => "Facebook",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::Tiktok),
            "snapchat" => Ok(Platform::Snapchat),
            "facebook" => Ok(Platform::Facebook),
            other => Err(format!(
                "platforms must be drawn from instagram, tiktok, snapchat, facebook (got {other:?})"
            )),
        }
    }
}

pub fn default_platforms() -> BTreeSet<Platform> {
    BTreeSet::from([Platform::Instagram])
}

/// Parses a comma-separated platform list; an empty list means the default.
pub fn parse_platforms(value: &str) -> Result<BTreeSet<Platform>, String> {
    let platforms = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(Platform::from_str)
        .collect::<Result<BTreeSet<_>, _>>()?;
    if platforms.is_empty() {
        Ok(default_platforms())
    } else {
        Ok(platforms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    TextOnly,
    ImageConditioned,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::TextOnly => "text_only",
            GenerationMode::ImageConditioned => "image_conditioned",
        }
    }
}

/// Whether a caption is produced and how its failure is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionPolicy {
    #[default]
    #[serde(alias = "off")]
    None,
    Optional,
    Required,
}

impl CaptionPolicy {
    pub fn is_requested(&self) -> bool {
        !matches!(self, CaptionPolicy::None)
    }
}

impl FromStr for CaptionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "false" => Ok(CaptionPolicy::None),
            "" | "optional" => Ok(CaptionPolicy::Optional),
            "required" | "true" => Ok(CaptionPolicy::Required),
            other => Err(format!(
                "caption must be one of none, optional, required (got {other:?})"
            )),
        }
    }
}

/// Creator profile metadata used to personalize the system prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileContext {
    pub tone: Vec<String>,
    pub visual_style: Vec<String>,
    pub niche: Option<String>,
    pub sub_niche: Option<String>,
}

/// Free-form creative hints accepted alongside the user text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreativeHints {
    pub image_description: Option<String>,
    pub style: Option<String>,
    pub mood: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}

impl ReferenceImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        encode_base64(&self.bytes)
    }
}

impl fmt::Debug for ReferenceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceImage")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub user_text: String,
    pub mode: GenerationMode,
    pub reference_image: Option<ReferenceImage>,
    pub format: Format,
    pub platforms: BTreeSet<Platform>,
    pub profile: ProfileContext,
    pub hints: CreativeHints,
    pub captions: CaptionPolicy,
}

impl GenerationRequest {
    pub fn text_only(user_text: impl Into<String>) -> Self {
        GenerationRequest {
            user_text: user_text.into(),
            mode: GenerationMode::TextOnly,
            reference_image: None,
            format: Format::default(),
            platforms: default_platforms(),
            profile: ProfileContext::default(),
            hints: CreativeHints::default(),
            captions: CaptionPolicy::None,
        }
    }

    pub fn image_conditioned(user_text: impl Into<String>, image: Option<ReferenceImage>) -> Self {
        GenerationRequest {
            mode: GenerationMode::ImageConditioned,
            reference_image: image,
            captions: CaptionPolicy::Optional,
            ..GenerationRequest::text_only(user_text)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageProvenance {
    Generated,
    FallbackOriginal,
}

#[derive(Clone, PartialEq, Eq)]
pub enum ImageData {
    Url(String),
    Inline { mime_type: String, data_base64: String },
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageData::Url(url) => f.debug_tuple("Url").field(url).finish(),
            ImageData::Inline {
                mime_type,
                data_base64,
            } => f
                .debug_struct("Inline")
                .field("mime_type", mime_type)
                .field("data_len", &data_base64.len())
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    pub data: ImageData,
    pub provenance: ImageProvenance,
}

impl ImageResult {
    pub fn generated_url(url: impl Into<String>) -> Self {
        ImageResult {
            data: ImageData::Url(url.into()),
            provenance: ImageProvenance::Generated,
        }
    }

    pub fn generated_inline(mime_type: impl Into<String>, data_base64: impl Into<String>) -> Self {
        ImageResult {
            data: ImageData::Inline {
                mime_type: mime_type.into(),
                data_base64: data_base64.into(),
            },
            provenance: ImageProvenance::Generated,
        }
    }

    pub fn fallback(image: &ReferenceImage) -> Self {
        ImageResult {
            data: ImageData::Inline {
                mime_type: image.mime_type.clone(),
                data_base64: image.to_base64(),
            },
            provenance: ImageProvenance::FallbackOriginal,
        }
    }

    /// Either the hosted URL or a `data:<mime>;base64,...` URI.
    pub fn to_url(&self) -> String {
        match &self.data {
            ImageData::Url(url) => url.clone(),
            ImageData::Inline {
                mime_type,
                data_base64,
            } => data_uri(mime_type, data_base64),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub master_prompt: String,
    pub image: ImageResult,
    pub caption: Option<String>,
    pub warning: Option<String>,
}
