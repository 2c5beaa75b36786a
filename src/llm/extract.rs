//! Image extraction from multimodal generation responses.
//!
//! Backends have shipped several response layouts over time, so the parser is
//! an ordered list of strategies. Each one knows a single layout and the first
//! that yields a decodable `image/*` payload wins.

use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;

use crate::llm::media::{normalize_image_mime_type, parse_data_uri, DEFAULT_GENERATED_MIME};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// `candidates[].content.parts[].inlineData { mimeType, data }`
    CandidateInlineData,
    /// `candidates[].content.parts[].inline_data { mime_type, data }`
    CandidateInlineDataSnakeCase,
    /// `predictions[] { bytesBase64Encoded, mimeType }`
    PredictionBytes,
    /// `generatedImages[].image { imageBytes, mimeType }`
    GeneratedImages,
    /// `candidates[].content.parts[].fileData.fileUri` carrying a `data:` URI
    CandidateFileDataUri,
}

pub const EXTRACTION_ORDER: [ExtractionStrategy; 5] = [
    ExtractionStrategy::CandidateInlineData,
    ExtractionStrategy::CandidateInlineDataSnakeCase,
    ExtractionStrategy::PredictionBytes,
    ExtractionStrategy::GeneratedImages,
    ExtractionStrategy::CandidateFileDataUri,
];

fn array_items<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

fn candidate_parts(response: &Value) -> impl Iterator<Item = &Value> {
    array_items(response, "candidates").flat_map(|candidate| {
        candidate
            .get("content")
            .map(|content| array_items(content, "parts"))
            .into_iter()
            .flatten()
    })
}

fn image_from(mime_type: Option<&str>, data: Option<&str>) -> Option<InlineImage> {
    let data = data?.trim();
    if data.is_empty() {
        return None;
    }
    let mime_type = mime_type
        .map(normalize_image_mime_type)
        .filter(|mime| !mime.is_empty())
        .unwrap_or_else(|| DEFAULT_GENERATED_MIME.to_string());
    if !mime_type.starts_with("image/") {
        return None;
    }
    if general_purpose::STANDARD.decode(data).is_err() {
        return None;
    }
    Some(InlineImage {
        mime_type,
        data: data.to_string(),
    })
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

impl ExtractionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionStrategy::CandidateInlineData => "candidate_inline_data",
            ExtractionStrategy::CandidateInlineDataSnakeCase => "candidate_inline_data_snake_case",
            ExtractionStrategy::PredictionBytes => "prediction_bytes",
            ExtractionStrategy::GeneratedImages => "generated_images",
            ExtractionStrategy::CandidateFileDataUri => "candidate_file_data_uri",
        }
    }

    pub fn extract(&self, response: &Value) -> Option<InlineImage> {
        match self {
            ExtractionStrategy::CandidateInlineData => candidate_parts(response).find_map(|part| {
                let inline = part.get("inlineData")?;
                image_from(str_field(inline, "mimeType"), str_field(inline, "data"))
            }),
            ExtractionStrategy::CandidateInlineDataSnakeCase => {
                candidate_parts(response).find_map(|part| {
                    let inline = part.get("inline_data")?;
                    image_from(str_field(inline, "mime_type"), str_field(inline, "data"))
                })
            }
            ExtractionStrategy::PredictionBytes => {
                array_items(response, "predictions").find_map(|prediction| {
                    image_from(
                        str_field(prediction, "mimeType"),
                        str_field(prediction, "bytesBase64Encoded"),
                    )
                })
            }
            ExtractionStrategy::GeneratedImages => {
                array_items(response, "generatedImages").find_map(|generated| {
                    let image = generated.get("image")?;
                    image_from(str_field(image, "mimeType"), str_field(image, "imageBytes"))
                })
            }
            ExtractionStrategy::CandidateFileDataUri => candidate_parts(response).find_map(|part| {
                let file_data = part.get("fileData")?;
                let (mime_type, data) = parse_data_uri(str_field(file_data, "fileUri")?)?;
                image_from(Some(mime_type.as_str()), Some(data.as_str()))
            }),
        }
    }
}

/// Runs every strategy in [`EXTRACTION_ORDER`] and returns the first hit.
pub fn extract_image(response: &Value) -> Option<(ExtractionStrategy, InlineImage)> {
    EXTRACTION_ORDER
        .iter()
        .find_map(|strategy| strategy.extract(response).map(|image| (*strategy, image)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn camel_case_inline_data_skips_text_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Here is your image" },
                { "inlineData": { "mimeType": "image/png", "data": "iVBORw0K" } }
            ] } }]
        });
        let (strategy, image) = extract_image(&response).unwrap();
        assert_eq!(strategy, ExtractionStrategy::CandidateInlineData);
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "iVBORw0K");
    }

    #[test]
    fn first_image_part_wins_across_candidates() {
        let response = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "no image here" }] } },
                { "content": { "parts": [
                    { "inlineData": { "mimeType": "image/webp", "data": "UklGRg==" } },
                    { "inlineData": { "mimeType": "image/png", "data": "iVBORw0K" } }
                ] } }
            ]
        });
        let image = ExtractionStrategy::CandidateInlineData.extract(&response).unwrap();
        assert_eq!(image.mime_type, "image/webp");
    }

    #[test]
    fn snake_case_layout() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "inline_data": { "mime_type": "image/jpeg", "data": "/9j/4AAQ" } }
            ] } }]
        });
        assert_eq!(ExtractionStrategy::CandidateInlineData.extract(&response), None);
        let (strategy, image) = extract_image(&response).unwrap();
        assert_eq!(strategy, ExtractionStrategy::CandidateInlineDataSnakeCase);
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[test]
    fn prediction_layout_defaults_missing_mime() {
        let response = json!({ "predictions": [{ "bytesBase64Encoded": "iVBORw0K" }] });
        let image = ExtractionStrategy::PredictionBytes.extract(&response).unwrap();
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn generated_images_layout() {
        let response = json!({
            "generatedImages": [{ "image": { "imageBytes": "iVBORw0K", "mimeType": "image/png" } }]
        });
        let (strategy, _) = extract_image(&response).unwrap();
        assert_eq!(strategy, ExtractionStrategy::GeneratedImages);
    }

    #[test]
    fn file_data_uri_layout() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "fileData": { "fileUri": "data:image/png;base64,iVBORw0K" } }
            ] } }]
        });
        let (strategy, image) = extract_image(&response).unwrap();
        assert_eq!(strategy, ExtractionStrategy::CandidateFileDataUri);
        assert_eq!(image.data, "iVBORw0K");
    }

    #[test]
    fn rejects_non_image_and_undecodable_payloads() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "audio/wav", "data": "UklGRg==" } },
                { "inlineData": { "mimeType": "image/png", "data": "%%not base64%%" } },
                { "inlineData": { "mimeType": "image/png", "data": "" } }
            ] } }]
        });
        assert_eq!(extract_image(&response), None);
    }

    #[test]
    fn malformed_shapes_yield_nothing() {
        assert_eq!(extract_image(&json!({ "candidates": "oops" })), None);
        assert_eq!(extract_image(&json!({ "candidates": [{ "content": null }] })), None);
        assert_eq!(extract_image(&json!([1, 2, 3])), None);
        assert_eq!(extract_image(&json!({ "promptFeedback": { "blockReason": "SAFETY" } })), None);
    }
}
