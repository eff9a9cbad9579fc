//! Catalog of every gauge the exporter publishes.

/// Static description of a gauge family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gauge {
    pub name: &'static str,
    pub help: &'static str,
    /// Label key for per-entity series; `None` for scalar gauges.
    pub label: Option<&'static str>,
}

impl Gauge {
    const fn scalar(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            label: None,
        }
    }

    const fn labeled(name: &'static str, help: &'static str, label: &'static str) -> Self {
        Self {
            name,
            help,
            label: Some(label),
        }
    }
}

// ── Per-job (latest run) ───────────────────────────────────────────

pub const JOB_START_TIME: Gauge = Gauge::labeled(
    "jams_job_start_time",
    "Unix time in milliseconds of the latest job start",
    "job_name",
);

pub const JOB_COMPLETION_TIME: Gauge = Gauge::labeled(
    "jams_job_completion_time",
    "Unix time in milliseconds of the latest job completion",
    "job_name",
);

pub const JOB_STATUS_CODE: Gauge = Gauge::labeled(
    "jams_job_status_code",
    "Final status code of the latest job run",
    "job_name",
);

/// Same value as [`JOB_STATUS_CODE`] under a name of its own. Earlier
/// exporters never published this series.
pub const JOB_FINAL_STATUS_CODE: Gauge = Gauge::labeled(
    "jams_job_final_status_code",
    "Final status code of the latest job run",
    "job_name",
);

pub const JOB_HISTORY_ID: Gauge = Gauge::labeled(
    "jams_job_history_id",
    "The history ID of the latest job run",
    "job_name",
);

// ── Per-agent ──────────────────────────────────────────────────────

pub const AGENT_JOB_LIMIT: Gauge = Gauge::labeled(
    "jams_job_limit_count",
    "Job limit for JAMS agent",
    "agent_name",
);

pub const AGENT_JOB_COUNT: Gauge = Gauge::labeled(
    "jams_agent_job_count",
    "Job count for JAMS agent",
    "agent_name",
);

// ── Totals ─────────────────────────────────────────────────────────

pub const JOBS_TOTAL: Gauge = Gauge::scalar("jams_jobs_count_total", "Total number of jobs in JAMS");

pub const AGENTS_TOTAL: Gauge =
    Gauge::scalar("jams_agents_count_total", "Total number of agents in JAMS");

pub const AGENTS_ONLINE: Gauge = Gauge::scalar(
    "jams_agents_active_count_total",
    "Total number of agents online in JAMS",
);

pub const FOLDERS_TOTAL: Gauge =
    Gauge::scalar("jams_folders_count_total", "Total number of folders in JAMS");

pub const SCRAPE_DURATION: Gauge = Gauge::scalar(
    "jams_scrape_duration",
    "Total number of milliseconds to scrape JAMS",
);

/// Every gauge, in exposition order.
pub const ALL: &[Gauge] = &[
    SCRAPE_DURATION,
    AGENTS_TOTAL,
    AGENTS_ONLINE,
    AGENT_JOB_LIMIT,
    AGENT_JOB_COUNT,
    JOBS_TOTAL,
    FOLDERS_TOTAL,
    JOB_START_TIME,
    JOB_HISTORY_ID,
    JOB_COMPLETION_TIME,
    JOB_STATUS_CODE,
    JOB_FINAL_STATUS_CODE,
];

/// Position of `gauge` in [`ALL`]; gauges outside the catalog sort last.
pub fn exposition_rank(gauge: &Gauge) -> usize {
    ALL.iter()
        .position(|g| g.name == gauge.name)
        .unwrap_or(ALL.len())
}
