//! HTTP implementation of [`JamsApi`] backed by reqwest.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::JamsApi;
use crate::error::{ApiError, ApiResult};
use crate::types::{AccessToken, Agent, Credentials, Folder, FolderId, HistoryRecord, Job, JobId};

const JSON_UTF8: &str = "application/json; charset=UTF-8";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated client for one JAMS server.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct JamsClient {
    /// Base URL with scheme and port, no trailing slash.
    host: String,
    credentials: Credentials,
    http: reqwest::Client,
}

impl fmt::Debug for JamsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JamsClient")
            .field("host", &self.host)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// Builder for [`JamsClient`].
#[derive(Debug)]
pub struct JamsClientBuilder {
    host: String,
    credentials: Credentials,
    skip_verify: bool,
    timeout: Duration,
}

impl JamsClientBuilder {
    /// Accept invalid or self-signed TLS certificates.
    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> ApiResult<JamsClient> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(self.skip_verify)
            .timeout(self.timeout)
            .user_agent(concat!("jams-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(JamsClient {
            host: self.host.trim_end_matches('/').to_string(),
            credentials: self.credentials,
            http,
        })
    }
}

impl JamsClient {
    /// Start building a client for `host` (e.g. `https://jams.local:6371`).
    pub fn builder(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> JamsClientBuilder {
        JamsClientBuilder {
            host: host.into(),
            credentials: Credentials {
                username: username.into(),
                password: password.into(),
            },
            skip_verify: false,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        format!("{}/jams/api{path}", self.host)
    }

    async fn get_json<T: DeserializeOwned>(&self, token: &AccessToken, path: &str) -> ApiResult<T> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .header(CONTENT_TYPE, JSON_UTF8)
            .header(ACCEPT, JSON_UTF8)
            .bearer_auth(token.secret())
            .send()
            .await?;
        decode(response, url).await
    }
}

/// Check the status and decode a JSON body.
async fn decode<T: DeserializeOwned>(response: reqwest::Response, url: String) -> ApiResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status { status, url });
    }
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|source| ApiError::Decode { url, source })
}

#[async_trait]
impl JamsApi for JamsClient {
    async fn login(&self) -> ApiResult<AccessToken> {
        if self.credentials.username.is_empty() || self.credentials.password.is_empty() {
            return Err(ApiError::Credentials);
        }
        let url = self.url("/authentication/login");
        debug!(%url, username = %self.credentials.username, "logging in to JAMS");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, JSON_UTF8)
            .json(&self.credentials)
            .send()
            .await?;
        decode(response, url).await
    }

    async fn list_agents(&self, token: &AccessToken) -> ApiResult<Vec<Agent>> {
        self.get_json(token, "/agent").await
    }

    async fn list_subfolders(&self, token: &AccessToken, parent: FolderId) -> ApiResult<Vec<Folder>> {
        self.get_json(token, &format!("/folder/children?id={parent}")).await
    }

    async fn list_jobs(&self, token: &AccessToken, folder: FolderId) -> ApiResult<Vec<Job>> {
        self.get_json(token, &format!("/job/folder/{folder}")).await
    }

    async fn latest_history(&self, token: &AccessToken, job: JobId) -> ApiResult<HistoryRecord> {
        let records: Vec<HistoryRecord> =
            self.get_json(token, &format!("/history/job/{job}")).await?;
        records.into_iter().next().ok_or(ApiError::NoHistory(job))
    }
}
