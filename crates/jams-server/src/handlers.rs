//! Route handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics: run one scrape cycle and expose the result.
pub async fn metrics(State(state): State<AppState>) -> Response {
    let cancel = CancellationToken::new();
    // Client went away: stop the scrape's outstanding calls.
    let _abandoned = cancel.clone().drop_guard();

    let deadline = state.scrape_timeout.map(|limit| {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            warn!(timeout_secs = limit.as_secs_f64(), "scrape timed out, cancelling JAMS calls");
            cancel.cancel();
        })
    });

    let outcome = state.scraper.scrape(cancel).await;
    if let Some(deadline) = deadline {
        deadline.abort();
    }

    match outcome {
        Ok(report) => {
            debug!(
                failures = report.failures.len(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "serving scrape"
            );
            (
                StatusCode::OK,
                [("content-type", PROMETHEUS_CONTENT_TYPE)],
                report.render(),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "scrape failed");
            (StatusCode::BAD_GATEWAY, format!("{e}\n")).into_response()
        }
    }
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}
