//! jams-server — HTTP surface of the JAMS exporter.
//!
//! Every `/metrics` request runs one full scrape cycle against JAMS and
//! answers with the resulting snapshot; nothing is cached between requests.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Scrape JAMS, Prometheus exposition |
//! | GET | `/healthz` | Liveness, does not contact JAMS |

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use jams_collector::Scraper;

/// Shared state for handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub scraper: Arc<Scraper>,
    /// Cancel a scrape's outstanding JAMS calls after this long.
    pub scrape_timeout: Option<Duration>,
}

/// Build the exporter router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(handlers::metrics))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
