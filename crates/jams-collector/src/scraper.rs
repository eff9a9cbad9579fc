//! Scrape orchestration: one call of [`Scraper::scrape`] is one full cycle.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jams_api::{JamsApi, ROOT_FOLDER_ID};
use jams_metrics::{GaugeSnapshot, gauges, render_prometheus};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::context::{Branch, BranchFailure, ScrapeContext, guarded};
use crate::error::{ScrapeError, ScrapeResult};
use crate::{jobs, walker};

/// How per-folder job counts are folded into `jams_jobs_count_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobCountMode {
    /// Add every folder's job count; the gauge ends at the true total.
    #[default]
    Sum,
    /// Each folder overwrites the gauge with its own count; whichever folder
    /// finishes last wins.
    LastBatch,
}

impl FromStr for JobCountMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Self::Sum),
            "last-batch" => Ok(Self::LastBatch),
            other => Err(format!(
                "unknown job count mode '{other}' (expected 'sum' or 'last-batch')"
            )),
        }
    }
}

impl fmt::Display for JobCountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum => f.write_str("sum"),
            Self::LastBatch => f.write_str("last-batch"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// Upper bound on JAMS calls in flight at once; `None` or `0` is unbounded.
    pub max_concurrency: Option<usize>,
    pub job_count_mode: JobCountMode,
}

/// Outcome of a scrape that got past authentication.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub gauges: GaugeSnapshot,
    /// Branches that contributed nothing, in completion order.
    pub failures: Vec<BranchFailure>,
    pub elapsed: Duration,
}

impl ScrapeReport {
    /// Prometheus text for this scrape.
    pub fn render(&self) -> String {
        render_prometheus(&self.gauges.families())
    }
}

/// Runs scrape cycles against one JAMS server.
pub struct Scraper {
    api: Arc<dyn JamsApi>,
    /// Shared by every scrape, so concurrent scrapes share the bound.
    limiter: Option<Arc<Semaphore>>,
    job_count_mode: JobCountMode,
}

impl fmt::Debug for Scraper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scraper")
            .field("limiter", &self.limiter)
            .field("job_count_mode", &self.job_count_mode)
            .finish_non_exhaustive()
    }
}

impl Scraper {
    pub fn new(api: Arc<dyn JamsApi>, options: ScrapeOptions) -> Self {
        let limiter = options
            .max_concurrency
            .filter(|&n| n > 0)
            .map(|n| Arc::new(Semaphore::new(n)));
        Self {
            api,
            limiter,
            job_count_mode: options.job_count_mode,
        }
    }

    /// Run one full scrape cycle.
    ///
    /// Fails only if authentication fails, in which case no gauge has been
    /// written. Every other failure is recorded in the report and leaves its
    /// branch out of the snapshot. Cancelling `cancel` makes all pending JAMS
    /// calls fail promptly, so the cycle still completes with what it has.
    pub async fn scrape(&self, cancel: CancellationToken) -> ScrapeResult<ScrapeReport> {
        let started = Instant::now();

        let token = guarded(self.limiter.as_deref(), &cancel, self.api.login())
            .await
            .map_err(ScrapeError::Login)?;

        let ctx = Arc::new(ScrapeContext::new(
            Arc::clone(&self.api),
            token,
            self.limiter.clone(),
            cancel,
        ));
        let snapshot = Arc::new(GaugeSnapshot::new());

        // Agents run alongside the folder walk.
        let mut background = JoinSet::new();
        background.spawn(publish_agents(Arc::clone(&ctx), Arc::clone(&snapshot)));

        match walker::walk(&ctx, ROOT_FOLDER_ID).await {
            Ok(folders) => {
                debug!(count = folders.len(), "found folders");
                snapshot.set(gauges::FOLDERS_TOTAL, folders.len() as f64);
                snapshot.set(gauges::JOBS_TOTAL, 0.0);

                let mut tasks = JoinSet::new();
                for folder in folders {
                    tasks.spawn(jobs::collect_folder(
                        Arc::clone(&ctx),
                        Arc::clone(&snapshot),
                        folder.id,
                        self.job_count_mode,
                    ));
                }
                while let Some(joined) = tasks.join_next().await {
                    if let Err(e) = joined {
                        error!(error = %e, "folder task failed");
                    }
                }
            }
            Err(e) => ctx.record_failure(Branch::Subfolders(ROOT_FOLDER_ID), &e),
        }

        while let Some(joined) = background.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "agents task failed");
            }
        }

        let elapsed = started.elapsed();
        snapshot.set(gauges::SCRAPE_DURATION, elapsed.as_millis() as f64);

        let failures = ctx.failures();
        let cancelled = ctx.is_cancelled();
        drop(ctx);
        debug!(
            series = snapshot.len(),
            failures = failures.len(),
            cancelled,
            elapsed_ms = elapsed.as_millis() as u64,
            "scrape complete"
        );

        Ok(ScrapeReport {
            gauges: Arc::unwrap_or_clone(snapshot),
            failures,
            elapsed,
        })
    }
}

async fn publish_agents(ctx: Arc<ScrapeContext>, snapshot: Arc<GaugeSnapshot>) {
    let agents = match ctx.agents().await {
        Ok(agents) => agents,
        Err(e) => {
            ctx.record_failure(Branch::Agents, &e);
            return;
        }
    };

    let online = agents.iter().filter(|a| a.online).count();
    debug!(total = agents.len(), online, "found agents");

    snapshot.set(gauges::AGENTS_TOTAL, agents.len() as f64);
    snapshot.set(gauges::AGENTS_ONLINE, online as f64);
    for agent in &agents {
        snapshot.set_labeled(gauges::AGENT_JOB_LIMIT, &agent.name, agent.job_limit as f64);
        snapshot.set_labeled(gauges::AGENT_JOB_COUNT, &agent.name, agent.job_count as f64);
    }
}
