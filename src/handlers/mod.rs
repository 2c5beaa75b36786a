pub mod generate;
pub mod health;
pub mod style;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::error::panic_response;
use crate::state::AppState;

const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Body limit for the whole request. Kept well above the upload ceiling so an
/// oversize file still reaches validation and is reported with its size.
fn request_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD_BYTES)
}

/// Matches an origin against a configured pattern. A single `*` in the
/// pattern stands for one or more characters, as in `https://*.vercel.app`.
fn origin_matches(pattern: &str, origin: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            origin.len() > prefix.len() + suffix.len()
                && origin.starts_with(prefix)
                && origin.ends_with(suffix)
        }
        None => pattern == origin,
    }
}

pub fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let patterns = origins.to_vec();
    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
        origin
            .to_str()
            .map(|origin| patterns.iter().any(|pattern| origin_matches(pattern, origin)))
            .unwrap_or(false)
    });

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

pub fn router(state: AppState) -> Router {
    let body_limit = request_body_limit(state.orchestrator.max_upload_bytes());
    let cors = build_cors_layer(&state.config.cors_origins);

    let api_v1 = Router::new()
        .route("/generate", post(generate::generate))
        .route("/analyze-style", post(style::analyze_style));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/api/generate", post(generate::generate))
        .nest("/api/v1", api_v1)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
