mod config;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::extraction::upload::ensure_upload_dir;
use crate::extraction::{build_estimator, ExtractionPipeline, TextExtractor, TokenBudgeter};
use crate::llm_client::{CompletionClient, LlmClient};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume parser v{}", env!("CARGO_PKG_VERSION"));

    let upload_dir = ensure_upload_dir(&config.upload_dir)?;
    info!("Staging uploads in {}", upload_dir.display());

    // Initialize LLM client
    let llm = LlmClient::new(config.llm.clone())?;
    info!(
        "LLM client initialized (provider: {:?}, model: {})",
        llm.provider(),
        llm.model()
    );
    let client: Arc<dyn CompletionClient> = Arc::new(llm);

    let estimator = build_estimator(config.token_estimator);
    info!(
        "Token budget: {} ({} estimator)",
        config.token_budget.get(),
        estimator.name()
    );
    let budgeter = TokenBudgeter::new(estimator, config.token_budget);

    let pipeline = ExtractionPipeline::new(
        TextExtractor::new(config.extraction_mode),
        budgeter,
        client,
        config.schema_variant,
    );
    info!(
        "Extraction mode: {:?}, schema: {:?}",
        config.extraction_mode, config.schema_variant
    );

    let port = config.port;
    let state = AppState {
        pipeline: Arc::new(pipeline),
        config: Arc::new(config),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
