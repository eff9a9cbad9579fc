//! End-to-end regression tests.
//!
//! Drive the exporter router with GET /metrics against an in-memory JAMS and
//! against a mock JAMS HTTP server through the real client.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use jams_api::memory::InMemoryJams;
use jams_api::{Agent, HistoryRecord, JamsApi, JamsClient};
use jams_collector::{ScrapeOptions, Scraper};
use jams_server::{AppState, build_router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

fn router_for(api: Arc<dyn JamsApi>) -> Router {
    build_router(AppState {
        scraper: Arc::new(Scraper::new(api, ScrapeOptions::default())),
        scrape_timeout: None,
    })
}

fn history(name: &str, id: i64, status: i64) -> HistoryRecord {
    HistoryRecord {
        job_name: name.to_string(),
        start_time: Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap(),
        completion_time: Some(Utc.with_ymd_and_hms(2024, 3, 1, 2, 15, 0).unwrap()),
        final_status_code: status,
        history_id: id,
    }
}

async fn get_metrics(router: Router) -> (StatusCode, String) {
    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Sample lines only, without the scrape duration.
fn stable_samples(body: &str) -> Vec<String> {
    body.lines()
        .filter(|l| !l.starts_with('#') && !l.starts_with("jams_scrape_duration"))
        .map(str::to_string)
        .collect()
}

fn upstream() -> InMemoryJams {
    InMemoryJams::new()
        .with_agents(vec![Agent {
            name: "etl-01".to_string(),
            id: 1,
            online: true,
            job_count: 3,
            job_limit: 10,
        }])
        .with_folder(1, &[2, 3])
        .with_folder(3, &[4])
        .with_jobs(2, &[21])
        .with_jobs(4, &[41, 42])
        .with_history(21, history("backup", 9001, 0))
        .with_history(41, history("report", 9002, 3))
}

#[tokio::test]
async fn metrics_reports_folder_tree_and_jobs() {
    let (status, body) = get_metrics(router_for(Arc::new(upstream()))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("jams_folders_count_total 3\n"));
    assert!(body.contains("jams_jobs_count_total 3\n"));
    assert!(body.contains("jams_agents_count_total 1\n"));
    assert!(body.contains("jams_agents_active_count_total 1\n"));
    assert!(body.contains("jams_job_limit_count{agent_name=\"etl-01\"} 10\n"));
    assert!(body.contains("jams_agent_job_count{agent_name=\"etl-01\"} 3\n"));
    assert!(body.contains("jams_job_start_time{job_name=\"backup\"} 1709258400000\n"));
    assert!(body.contains("jams_job_completion_time{job_name=\"backup\"} 1709259300000\n"));
    assert!(body.contains("jams_job_status_code{job_name=\"report\"} 3\n"));
    assert!(body.contains("jams_job_final_status_code{job_name=\"report\"} 3\n"));
    assert!(body.contains("jams_job_history_id{job_name=\"report\"} 9002\n"));
    assert!(body.contains("# TYPE jams_scrape_duration gauge"));
}

#[tokio::test]
async fn job_without_history_is_left_out() {
    let (status, body) = get_metrics(router_for(Arc::new(upstream()))).await;

    assert_eq!(status, StatusCode::OK);
    // Job 42 has never run; nothing is published for it, not even an
    // empty-named series.
    assert!(!body.contains("job_name=\"\""));
    let start_series = body
        .lines()
        .filter(|l| l.starts_with("jams_job_start_time{"))
        .count();
    assert_eq!(start_series, 2);
}

#[tokio::test]
async fn login_rejected_returns_error_without_metrics() {
    let api = Arc::new(upstream().fail_login(StatusCode::UNAUTHORIZED));
    let (status, body) = get_metrics(router_for(api.clone())).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!body.contains("jams_"));
    assert_eq!(api.calls(), 0);
}

#[tokio::test]
async fn every_request_is_a_fresh_scrape() {
    let api = Arc::new(upstream());
    let router = router_for(api.clone());

    let (_, first) = get_metrics(router.clone()).await;
    let (_, second) = get_metrics(router).await;

    assert_eq!(api.login_calls(), 2);
    assert_eq!(stable_samples(&first), stable_samples(&second));
}

#[tokio::test]
async fn healthz_does_not_touch_jams() {
    let api = Arc::new(upstream());
    let router = router_for(api.clone());

    let req = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(api.login_calls(), 0);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let req = Request::builder()
        .uri("/api/v1/anything")
        .body(Body::empty())
        .unwrap();
    let resp = router_for(Arc::new(upstream())).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Through the real HTTP client ───────────────────────────────────

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer mock-token")
}

async fn start_mock_jams() -> String {
    async fn guarded(headers: HeaderMap, body: Value) -> (StatusCode, Json<Value>) {
        if bearer_ok(&headers) {
            (StatusCode::OK, Json(body))
        } else {
            (StatusCode::UNAUTHORIZED, Json(Value::Null))
        }
    }

    let router = Router::new()
        .route(
            "/jams/api/authentication/login",
            post(|| async { Json(json!({ "access_token": "mock-token" })) }),
        )
        .route(
            "/jams/api/agent",
            get(|h: HeaderMap| guarded(h, json!([]))),
        )
        .route(
            "/jams/api/folder/children",
            get(
                |h: HeaderMap,
                 axum::extract::Query(q): axum::extract::Query<
                    std::collections::HashMap<String, i64>,
                >| async move {
                    let children = match q.get("id").copied() {
                        Some(1) => json!([{ "folderID": 2 }, { "folderID": 3 }]),
                        Some(3) => json!([{ "folderID": 4 }]),
                        _ => json!([]),
                    };
                    guarded(h, children).await
                },
            ),
        )
        .route(
            "/jams/api/job/folder/{id}",
            get(
                |h: HeaderMap, axum::extract::Path(id): axum::extract::Path<i64>| async move {
                    let jobs = if id == 4 { json!([{ "jobID": 400 }]) } else { json!([]) };
                    guarded(h, jobs).await
                },
            ),
        )
        .route(
            "/jams/api/history/job/{id}",
            get(|h: HeaderMap| {
                guarded(
                    h,
                    json!([{
                        "jobName": "deep-job",
                        "startTimeUTC": "2024-03-01T02:00:00Z",
                        "completionTimeUTC": "2024-03-01T02:15:00Z",
                        "finalStatusCode": 0,
                        "historyID": 12
                    }]),
                )
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn scrape_through_http_client() {
    let host = start_mock_jams().await;
    let client = JamsClient::builder(&host, "svc", "pw").build().unwrap();

    let (status, body) = get_metrics(router_for(Arc::new(client))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("jams_folders_count_total 3\n"));
    assert!(body.contains("jams_jobs_count_total 1\n"));
    assert!(body.contains("jams_agents_count_total 0\n"));
    assert!(body.contains("jams_job_history_id{job_name=\"deep-job\"} 12\n"));
}
