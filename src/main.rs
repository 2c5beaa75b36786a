use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;

mod config;
mod error;
mod handlers;
mod llm;
mod pipeline;
mod state;
mod utils;

use config::Config;
use llm::{FeatherlessClient, GeminiImageClient, ImageSynthesizer, PollinationsClient};
use pipeline::{Orchestrator, OrchestratorSettings};
use state::AppState;
use utils::http::build_http_client;
use utils::logging::init_logging;

fn build_orchestrator(config: &Config) -> anyhow::Result<Orchestrator> {
    let http = build_http_client(Duration::from_secs(config.http_timeout_seconds))
        .context("failed to build HTTP client")?;

    let completion = FeatherlessClient::new(
        http.clone(),
        &config.featherless_base_url,
        &config.featherless_api_key,
        &config.featherless_model,
    );
    let images = ImageSynthesizer::new(
        PollinationsClient::new(
            http.clone(),
            &config.pollinations_base_url,
            config.pollinations_prefetch,
        ),
        GeminiImageClient::new(
            http,
            &config.gemini_base_url,
            &config.gemini_api_key,
            &config.gemini_image_model,
            config.gemini_aspect_ratio,
        ),
    );

    Ok(Orchestrator::new(
        Arc::new(completion),
        Arc::new(images),
        OrchestratorSettings::from_config(config),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down."),
        () = terminate => info!("Received SIGTERM, shutting down."),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::load()?;
    let _guards = init_logging(&config);
    config.warn_missing_credentials();

    let orchestrator = build_orchestrator(&config)?;
    let address = config.bind_address();
    info!(
        address = %address,
        text_model = %config.featherless_model,
        image_model = %config.gemini_image_model,
        "Starting CreatorFlow generation service"
    );

    let app = handlers::router(AppState::new(config, orchestrator));
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutdown complete");
    Ok(())
}
