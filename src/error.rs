use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::llm::CompletionError;
use crate::pipeline::style::StyleError;

fn format_limit(limit: usize) -> String {
    const MB: usize = 1024 * 1024;
    if limit >= MB && limit % MB == 0 {
        format!("{} MB", limit / MB)
    } else {
        format!("{limit} bytes")
    }
}

fn too_large_detail(size: &Option<usize>, limit: &usize) -> String {
    match size {
        Some(size) => format!(
            "file size of {size} bytes exceeds the maximum upload size of {}",
            format_limit(*limit)
        ),
        None => format!(
            "file size exceeds the maximum upload size of {}",
            format_limit(*limit)
        ),
    }
}

/// Every way a generation request can end without a response body.
///
/// Image synthesis failures are absent on purpose: they become a fallback
/// plus a warning, and only surface here when nothing can be substituted.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{}", too_large_detail(.size, .limit))]
    FileTooLarge { size: Option<usize>, limit: usize },

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Failed to generate master prompt")]
    PromptGeneration(#[source] CompletionError),

    #[error("Failed to generate caption")]
    CaptionGeneration(#[source] CompletionError),

    #[error("Failed to generate image")]
    ImageGeneration(String),

    #[error("Failed to analyze style")]
    StyleAnalysis(#[source] StyleError),

    #[error("{0}")]
    Internal(String),
}

impl GenerationError {
    pub fn status(&self) -> StatusCode {
        match self {
            GenerationError::MissingField(_) | GenerationError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            GenerationError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GenerationError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            GenerationError::ImageGeneration(_) => StatusCode::BAD_GATEWAY,
            GenerationError::NotConfigured(_)
            | GenerationError::PromptGeneration(_)
            | GenerationError::CaptionGeneration(_)
            | GenerationError::StyleAnalysis(_)
            | GenerationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::MissingField(_)
            | GenerationError::InvalidInput(_)
            | GenerationError::FileTooLarge { .. }
            | GenerationError::UnsupportedMediaType(_) => "client_input",
            GenerationError::NotConfigured(_) => "configuration",
            GenerationError::PromptGeneration(_)
            | GenerationError::CaptionGeneration(_)
            | GenerationError::StyleAnalysis(_) => "upstream_text",
            GenerationError::ImageGeneration(_) => "upstream_image",
            GenerationError::Internal(_) => "unknown",
        }
    }
}

impl IntoResponse for GenerationError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        if status.is_server_error() {
            let cause = match &self {
                GenerationError::ImageGeneration(reason) => reason.clone(),
                other => std::error::Error::source(other)
                    .map(|source| source.to_string())
                    .unwrap_or_default(),
            };
            error!(kind = self.kind(), status = %status, cause = %cause, "{detail}");
        } else {
            warn!(kind = self.kind(), status = %status, "{detail}");
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Converts a handler panic into the same `{detail}` body as other failures.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "Internal Server Error".to_string()
    };
    error!(kind = "unknown", "request handler panicked: {detail}");
    GenerationError::Internal(detail).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn error_to_response(err: GenerationError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn missing_field_returns_400_naming_the_field() {
        let (status, json) = error_to_response(GenerationError::MissingField("user_text")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["detail"], "user_text is required");
    }

    #[tokio::test]
    async fn oversize_file_returns_413_with_size() {
        let (status, json) = error_to_response(GenerationError::FileTooLarge {
            size: Some(3 * 1024 * 1024),
            limit: 2 * 1024 * 1024,
        })
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            json["detail"],
            "file size of 3145728 bytes exceeds the maximum upload size of 2 MB"
        );
    }

    #[tokio::test]
    async fn missing_credential_returns_500() {
        let (status, json) =
            error_to_response(GenerationError::NotConfigured("GEMINI_API_KEY")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["detail"], "GEMINI_API_KEY is not configured");
    }

    #[tokio::test]
    async fn prompt_failure_hides_upstream_detail() {
        let (status, json) = error_to_response(GenerationError::PromptGeneration(
            CompletionError::Transport("connection reset with secret token".to_string()),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["detail"], "Failed to generate master prompt");
    }

    #[tokio::test]
    async fn image_failure_hides_provider_message() {
        let (status, json) = error_to_response(GenerationError::ImageGeneration(
            "image backend returned status 403 Forbidden: project 123456 quota".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["detail"], "Failed to generate image");
    }

    #[tokio::test]
    async fn panic_payload_becomes_detail() {
        let response = panic_response(Box::new("boom".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["detail"], "boom");
    }

    #[test]
    fn limit_formatting() {
        assert_eq!(format_limit(2 * 1024 * 1024), "2 MB");
        assert_eq!(format_limit(1500), "1500 bytes");
    }
}
