mod ats;
mod canonical;
mod config;
mod errors;
mod layout;
mod merge;
mod models;
mod pipeline;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::layout::TemplateConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Template is loaded once and shared read-only
    let template = match &config.template_path {
        Some(path) => TemplateConfig::load(path)
            .with_context(|| format!("failed to load template from {}", path.display()))?,
        None => TemplateConfig::harvard(),
    };
    info!(
        font = ?template.font,
        font_size = template.font_size,
        page_budget_pt = template.page_budget(),
        "Template loaded"
    );
    info!(
        target_years = config.ats_target_years,
        rewrite_timeout_ms = config.rewrite_timeout.as_millis() as u64,
        cache_capacity = config.cache_capacity,
        "Pipeline configured"
    );

    let port = config.port;
    let state = AppState::new(config, template);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS once the UI origin is fixed

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
