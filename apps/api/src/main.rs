mod assessment_client;
mod config;
mod directory_client;
mod errors;
mod exam;
mod listing;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assessment_client::AssessmentClient;
use crate::config::Config;
use crate::directory_client::DirectoryClient;
use crate::exam::registry::ExamRegistry;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting exam flow API v{}", env!("CARGO_PKG_VERSION"));

    let assessment = AssessmentClient::new(&config.assessment_service_url, config.http_timeout)?;
    info!("Assessment client initialized ({})", config.assessment_service_url);

    let directory = DirectoryClient::new(&config.directory_service_url, config.http_timeout)?;
    info!("Directory client initialized ({})", config.directory_service_url);

    let exams = Arc::new(ExamRegistry::default());
    exams.spawn_sweeper(config.flow_sweep_interval, config.flow_idle_ttl);
    info!(
        "Idle exam flows expire after {}s",
        config.flow_idle_ttl.as_secs()
    );

    let state = AppState {
        config: config.clone(),
        assessment,
        directory,
        exams,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
