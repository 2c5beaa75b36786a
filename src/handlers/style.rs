use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::error::GenerationError;
use crate::pipeline::style::StyleProfile;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeStyleBody {
    #[serde(default)]
    pub text_samples: Vec<String>,
}

/// POST /api/v1/analyze-style
pub async fn analyze_style(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeStyleBody>, JsonRejection>,
) -> Result<Json<StyleProfile>, GenerationError> {
    let Json(body) = body.map_err(|rejection| GenerationError::InvalidInput(rejection.body_text()))?;
    info!(samples = body.text_samples.len(), "Analyzing writing style.");
    let profile = state.orchestrator.analyze_style(body.text_samples).await?;
    Ok(Json(profile))
}
