//! Job enumeration and latest-run history per job.

use std::sync::Arc;

use jams_api::{ApiResult, FolderId, HistoryRecord, Job, JobId};
use jams_metrics::{GaugeSnapshot, gauges};
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::context::{Branch, ScrapeContext};
use crate::scraper::JobCountMode;

/// Jobs directly inside `folder`.
pub async fn jobs_of(ctx: &ScrapeContext, folder: FolderId) -> ApiResult<Vec<Job>> {
    ctx.jobs(folder).await
}

/// Most recent run of `job`.
pub async fn latest_history_of(ctx: &ScrapeContext, job: JobId) -> ApiResult<HistoryRecord> {
    ctx.latest_history(job).await
}

/// List the jobs of one folder, count them, and publish each job's latest
/// run. Returns once every history task for this folder has finished.
pub(crate) async fn collect_folder(
    ctx: Arc<ScrapeContext>,
    snapshot: Arc<GaugeSnapshot>,
    folder: FolderId,
    mode: JobCountMode,
) {
    let jobs = match jobs_of(&ctx, folder).await {
        Ok(jobs) => jobs,
        Err(e) => {
            ctx.record_failure(Branch::Jobs(folder), &e);
            return;
        }
    };
    debug!(folder_id = folder, jobs = jobs.len(), "listed jobs");

    let batch = jobs.len() as f64;
    match mode {
        JobCountMode::Sum => snapshot.add(gauges::JOBS_TOTAL, batch),
        JobCountMode::LastBatch => snapshot.set(gauges::JOBS_TOTAL, batch),
    }

    let mut tasks = JoinSet::new();
    for job in jobs {
        tasks.spawn(publish_history(Arc::clone(&ctx), Arc::clone(&snapshot), job.id));
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(folder_id = folder, error = %e, "history task failed");
        }
    }
}

/// Fetch and publish the latest run of `job`; publishes nothing on failure.
async fn publish_history(ctx: Arc<ScrapeContext>, snapshot: Arc<GaugeSnapshot>, job: JobId) {
    match latest_history_of(&ctx, job).await {
        Ok(record) => record_history(&snapshot, &record),
        Err(e) => ctx.record_failure(Branch::History(job), &e),
    }
}

fn record_history(snapshot: &GaugeSnapshot, record: &HistoryRecord) {
    let name = record.job_name.as_str();
    snapshot.set_labeled(
        gauges::JOB_START_TIME,
        name,
        record.start_time.timestamp_millis() as f64,
    );
    if let Some(completed) = record.completion_time {
        snapshot.set_labeled(
            gauges::JOB_COMPLETION_TIME,
            name,
            completed.timestamp_millis() as f64,
        );
    }
    let status = record.final_status_code as f64;
    snapshot.set_labeled(gauges::JOB_STATUS_CODE, name, status);
    snapshot.set_labeled(gauges::JOB_FINAL_STATUS_CODE, name, status);
    snapshot.set_labeled(gauges::JOB_HISTORY_ID, name, record.history_id as f64);
}
