// This is the entry point of the Target GAP analysis service.
//
// **Architecture Overview:**
// - `core/` = Business logic (gap extraction, report content, the pipeline)
// - `infra/` = Implementations of core traits (HTTP downloads, calamine, OOXML, Drive, callback)
// - `http/` = The axum endpoint that starts sessions
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Serve the HTTP endpoint until Ctrl+C

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "http/http_layer.rs"]
mod http;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core::pipeline::PipelineService;
use crate::core::session::{BackgroundDispatcher, SessionService};
use crate::infra::fetch::HttpFileFetcher;
use crate::infra::google_drive::DrivePublisher;
use crate::infra::notify::ComplianceNotifier;
use crate::infra::render::OoxmlRenderer;
use crate::infra::spreadsheet::CalamineReader;

type GapPipeline = PipelineService<
    HttpFileFetcher,
    CalamineReader,
    OoxmlRenderer,
    DrivePublisher,
    ComplianceNotifier,
>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // RUST_LOG wins; otherwise log at info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env();

    // Session folders live under one root so the working directory stays tidy.
    std::fs::create_dir_all(&config.base_dir).with_context(|| {
        format!("Failed to create base directory {}", config.base_dir.display())
    })?;

    // Initialize the pipeline adapters
    let fetcher =
        HttpFileFetcher::new(config.fetch_timeout).context("Failed to build download client")?;
    let publisher = DrivePublisher::from_credentials(
        config.service_account_json.as_deref(),
        config.service_account_key_path.as_deref(),
    )
    .await;
    if publisher.is_configured() {
        tracing::info!("Google Drive uploads enabled");
    }
    let notifier = ComplianceNotifier::new(config.callback_url.clone(), config.fetch_timeout)
        .context("Failed to build callback client")?;
    tracing::info!(url = notifier.url(), "Completion callbacks configured");

    let pipeline: GapPipeline =
        PipelineService::new(fetcher, CalamineReader::new(), OoxmlRenderer, publisher, notifier);
    let sessions = SessionService::new(&config.base_dir, BackgroundDispatcher::new(pipeline));

    let app = http::router(Arc::new(sessions));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, base_dir = %config.base_dir.display(), "Target GAP Analysis API started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("HTTP server error")?;

    tracing::info!("Target GAP Analysis API stopped");
    Ok(())
}
