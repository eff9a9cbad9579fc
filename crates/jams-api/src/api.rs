//! The call surface the collection pipeline depends on.

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::types::{AccessToken, Agent, Folder, FolderId, HistoryRecord, Job, JobId};

/// Blocking-per-task view of the JAMS REST API.
///
/// Implementations must be shareable across spawned tasks. Each call is
/// independent; nothing is retried and the token is never refreshed.
#[async_trait]
pub trait JamsApi: Send + Sync + 'static {
    /// Authenticate and return a bearer token for the other calls.
    async fn login(&self) -> ApiResult<AccessToken>;

    async fn list_agents(&self, token: &AccessToken) -> ApiResult<Vec<Agent>>;

    /// Direct children of `parent` (one level only).
    async fn list_subfolders(&self, token: &AccessToken, parent: FolderId) -> ApiResult<Vec<Folder>>;

    async fn list_jobs(&self, token: &AccessToken, folder: FolderId) -> ApiResult<Vec<Job>>;

    /// Most recent run of `job`.
    ///
    /// Fails with [`ApiError::NoHistory`](crate::ApiError::NoHistory) when the
    /// job has never run.
    async fn latest_history(&self, token: &AccessToken, job: JobId) -> ApiResult<HistoryRecord>;
}
