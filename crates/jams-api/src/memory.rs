//! In-memory [`JamsApi`] for driving the pipeline without a JAMS server.
//!
//! Built up with chained `with_*` / `fail_*` calls, then shared behind an
//! `Arc`. Tracks call counts and peak concurrency so tests can assert on
//! fan-out behaviour.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::api::JamsApi;
use crate::error::{ApiError, ApiResult};
use crate::types::{AccessToken, Agent, Folder, FolderId, HistoryRecord, Job, JobId};

const TOKEN: &str = "in-memory-token";

/// Fixture-backed JAMS API.
#[derive(Debug, Default)]
pub struct InMemoryJams {
    login_failure: Option<StatusCode>,
    agents: Option<Vec<Agent>>,
    children: HashMap<FolderId, Vec<FolderId>>,
    failing_folders: HashSet<FolderId>,
    jobs: HashMap<FolderId, Vec<JobId>>,
    failing_job_lists: HashSet<FolderId>,
    history: HashMap<JobId, Vec<HistoryRecord>>,
    latency: Option<Duration>,
    login_calls: AtomicUsize,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryJams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `login` answer with `status`.
    pub fn fail_login(mut self, status: StatusCode) -> Self {
        self.login_failure = Some(status);
        self
    }

    /// Agents returned by `list_agents`. Without this the call fails with 500.
    pub fn with_agents(mut self, agents: Vec<Agent>) -> Self {
        self.agents = Some(agents);
        self
    }

    /// Register `children` under `parent`. Unregistered folders have no children.
    pub fn with_folder(mut self, parent: FolderId, children: &[FolderId]) -> Self {
        self.children.insert(parent, children.to_vec());
        self
    }

    /// Make `list_subfolders(folder)` fail with 500.
    pub fn fail_subfolders(mut self, folder: FolderId) -> Self {
        self.failing_folders.insert(folder);
        self
    }

    pub fn with_jobs(mut self, folder: FolderId, jobs: &[JobId]) -> Self {
        self.jobs.insert(folder, jobs.to_vec());
        self
    }

    /// Make `list_jobs(folder)` fail with 500.
    pub fn fail_jobs(mut self, folder: FolderId) -> Self {
        self.failing_job_lists.insert(folder);
        self
    }

    /// Append a run record for `job`; the first one added is the latest.
    pub fn with_history(mut self, job: JobId, record: HistoryRecord) -> Self {
        self.history.entry(job).or_default().push(record);
        self
    }

    /// Delay every call by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    /// Authenticated calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls in progress right now.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, token: &AccessToken) -> ApiResult<InFlight<'_>> {
        if token.secret() != TOKEN {
            return Err(status_error(StatusCode::UNAUTHORIZED, "token"));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(guard)
    }
}

/// Decrements the in-flight counter when a call finishes or is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn status_error(status: StatusCode, what: &str) -> ApiError {
    ApiError::Status {
        status,
        url: format!("memory://{what}"),
    }
}

#[async_trait]
impl JamsApi for InMemoryJams {
    async fn login(&self) -> ApiResult<AccessToken> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        match self.login_failure {
            Some(status) => Err(status_error(status, "authentication/login")),
            None => Ok(AccessToken::new(TOKEN)),
        }
    }

    async fn list_agents(&self, token: &AccessToken) -> ApiResult<Vec<Agent>> {
        let _call = self.enter(token).await?;
        self.agents
            .clone()
            .ok_or_else(|| status_error(StatusCode::INTERNAL_SERVER_ERROR, "agent"))
    }

    async fn list_subfolders(&self, token: &AccessToken, parent: FolderId) -> ApiResult<Vec<Folder>> {
        let _call = self.enter(token).await?;
        if self.failing_folders.contains(&parent) {
            return Err(status_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("folder/children?id={parent}"),
            ));
        }
        Ok(self
            .children
            .get(&parent)
            .map(|ids| ids.iter().map(|&id| Folder { id }).collect())
            .unwrap_or_default())
    }

    async fn list_jobs(&self, token: &AccessToken, folder: FolderId) -> ApiResult<Vec<Job>> {
        let _call = self.enter(token).await?;
        if self.failing_job_lists.contains(&folder) {
            return Err(status_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("job/folder/{folder}"),
            ));
        }
        Ok(self
            .jobs
            .get(&folder)
            .map(|ids| ids.iter().map(|&id| Job { id }).collect())
            .unwrap_or_default())
    }

    async fn latest_history(&self, token: &AccessToken, job: JobId) -> ApiResult<HistoryRecord> {
        let _call = self.enter(token).await?;
        self.history
            .get(&job)
            .and_then(|records| records.first().cloned())
            .ok_or(ApiError::NoHistory(job))
    }
}
