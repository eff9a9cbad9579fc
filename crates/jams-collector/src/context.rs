//! Per-scrape call context shared by every collection task.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use jams_api::{AccessToken, Agent, ApiError, ApiResult, Folder, FolderId, HistoryRecord, JamsApi, Job, JobId};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// The part of the collection tree a failure was confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Agents,
    Subfolders(FolderId),
    Jobs(FolderId),
    History(JobId),
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agents => write!(f, "agents"),
            Self::Subfolders(id) => write!(f, "subfolders of folder {id}"),
            Self::Jobs(id) => write!(f, "jobs of folder {id}"),
            Self::History(id) => write!(f, "history of job {id}"),
        }
    }
}

/// A branch that produced no data during a scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFailure {
    pub branch: Branch,
    pub error: String,
}

/// Authenticated view of the API for one scrape.
///
/// Every call waits for a slot on the optional limiter and races the scrape's
/// cancellation token. No lock is held while a call is in flight.
pub struct ScrapeContext {
    api: Arc<dyn JamsApi>,
    token: AccessToken,
    limiter: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
    failures: Mutex<Vec<BranchFailure>>,
}

impl fmt::Debug for ScrapeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeContext")
            .field("limited", &self.limiter.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ScrapeContext {
    pub fn new(
        api: Arc<dyn JamsApi>,
        token: AccessToken,
        limiter: Option<Arc<Semaphore>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            token,
            limiter,
            cancel,
            failures: Mutex::new(Vec::new()),
        }
    }

    async fn call<T>(&self, call: impl Future<Output = ApiResult<T>>) -> ApiResult<T> {
        guarded(self.limiter.as_deref(), &self.cancel, call).await
    }

    pub async fn agents(&self) -> ApiResult<Vec<Agent>> {
        self.call(self.api.list_agents(&self.token)).await
    }

    pub async fn subfolders(&self, parent: FolderId) -> ApiResult<Vec<Folder>> {
        self.call(self.api.list_subfolders(&self.token, parent)).await
    }

    pub async fn jobs(&self, folder: FolderId) -> ApiResult<Vec<Job>> {
        self.call(self.api.list_jobs(&self.token, folder)).await
    }

    pub async fn latest_history(&self, job: JobId) -> ApiResult<HistoryRecord> {
        self.call(self.api.latest_history(&self.token, job)).await
    }

    /// Log a branch failure and remember it for the scrape report.
    pub fn record_failure(&self, branch: Branch, error: &ApiError) {
        warn!(%branch, error = %error, "JAMS call failed, branch skipped");
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(BranchFailure {
                branch,
                error: error.to_string(),
            });
    }

    pub fn failures(&self) -> Vec<BranchFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Run `call` under the limiter, giving up as soon as `cancel` fires.
pub(crate) async fn guarded<T>(
    limiter: Option<&Semaphore>,
    cancel: &CancellationToken,
    call: impl Future<Output = ApiResult<T>>,
) -> ApiResult<T> {
    let _permit = match limiter {
        Some(limiter) => tokio::select! {
            permit = limiter.acquire() => Some(permit.map_err(|_| ApiError::Cancelled)?),
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
        },
        None => None,
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
        result = call => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: ApiResult<()> = guarded(None, &cancel, async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ApiError::Cancelled)));
    }

    #[tokio::test]
    async fn waiting_for_a_permit_is_cancellable() {
        let limiter = Semaphore::new(1);
        let _held = limiter.acquire().await.unwrap();
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = guarded(Some(&limiter), &cancel, async { Ok(1) }).await;
        assert!(matches!(result, Err(ApiError::Cancelled)));
    }

    #[test]
    fn branch_display() {
        assert_eq!(Branch::History(9).to_string(), "history of job 9");
        assert_eq!(Branch::Subfolders(3).to_string(), "subfolders of folder 3");
    }
}
