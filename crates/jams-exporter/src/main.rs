//! jams-exporter — Prometheus exporter for the JAMS job scheduler.
//!
//! Serves `/metrics`; every request logs in to JAMS, walks the folder tree,
//! collects the latest run of every job plus agent state, and answers with
//! the resulting gauges.
//!
//! # Usage
//!
//! ```text
//! jams-exporter --host https://jams.local:6371 -u svc-prom -p '...' --port 8000
//! ```

mod config;

use std::sync::Arc;

use clap::Parser;
use jams_api::JamsClient;
use jams_collector::{ScrapeOptions, Scraper};
use jams_server::{AppState, build_router};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, ExporterConfig, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ExporterConfig::resolve(cli)?;

    init_tracing(&config);

    run(config).await
}

fn init_tracing(config: &ExporterConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn run(config: ExporterConfig) -> anyhow::Result<()> {
    info!(host = %config.host, "JAMS exporter starting");

    // ── JAMS client ────────────────────────────────────────────

    if config.skip_verify {
        warn!("TLS certificate verification disabled for JAMS");
    }
    let client = JamsClient::builder(&config.host, &config.username, &config.password)
        .skip_verify(config.skip_verify)
        .timeout(config.request_timeout)
        .build()?;

    // ── Scraper ────────────────────────────────────────────────

    let scraper = Scraper::new(
        Arc::new(client),
        ScrapeOptions {
            max_concurrency: config.max_concurrency,
            job_count_mode: config.job_count_mode,
        },
    );
    info!(
        max_concurrency = ?config.max_concurrency,
        job_count_mode = %config.job_count_mode,
        "scraper initialized"
    );

    // ── HTTP server ────────────────────────────────────────────

    let router = build_router(AppState {
        scraper: Arc::new(scraper),
        scrape_timeout: config.scrape_timeout,
    });

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!(addr = %config.listen, "metrics server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("JAMS exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
