//! Wire types returned by the JAMS REST API.
//!
//! Field names follow the JAMS JSON payloads; everything is decoded with
//! serde and lives only for the duration of one scrape.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric identifier of a JAMS folder.
pub type FolderId = i64;

/// Numeric identifier of a JAMS job.
pub type JobId = i64;

/// Numeric identifier of a JAMS agent.
pub type AgentId = i64;

/// Folder ID JAMS uses for the top of the folder hierarchy.
pub const ROOT_FOLDER_ID: FolderId = 1;

// ── Authentication ─────────────────────────────────────────────────

/// Credentials posted to the login endpoint.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bearer token returned by a successful login.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "access_token")]
    secret: String,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Raw token value for the `Authorization` header.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

// ── Agents ─────────────────────────────────────────────────────────

/// A JAMS execution agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Agent {
    #[serde(rename = "agentName")]
    pub name: String,
    #[serde(rename = "agentID")]
    pub id: AgentId,
    pub online: bool,
    /// Jobs currently running on the agent.
    #[serde(rename = "jobCount")]
    pub job_count: i64,
    /// Maximum concurrent jobs allowed on the agent.
    #[serde(rename = "jobLimit")]
    pub job_limit: i64,
}

// ── Folders and jobs ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Folder {
    #[serde(rename = "folderID")]
    pub id: FolderId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "jobID")]
    pub id: JobId,
}

// ── History ────────────────────────────────────────────────────────

/// One completed (or in-flight) run of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "jobName")]
    pub job_name: String,
    #[serde(rename = "startTimeUTC")]
    pub start_time: DateTime<Utc>,
    /// Absent while the run is still in progress.
    #[serde(rename = "completionTimeUTC", default)]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(rename = "finalStatusCode", default)]
    pub final_status_code: i64,
    #[serde(rename = "historyID")]
    pub history_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_decodes_from_jams_payload() {
        let agent: Agent = serde_json::from_str(
            r#"{"agentName":"etl-01","agentID":7,"online":true,"jobCount":2,"jobLimit":10,"platform":"Windows"}"#,
        )
        .unwrap();

        assert_eq!(agent.name, "etl-01");
        assert_eq!(agent.id, 7);
        assert!(agent.online);
        assert_eq!(agent.job_count, 2);
        assert_eq!(agent.job_limit, 10);
    }

    #[test]
    fn agent_missing_fields_default_to_zero() {
        let agent: Agent = serde_json::from_str(r#"{"agentName":"idle"}"#).unwrap();
        assert!(!agent.online);
        assert_eq!(agent.job_limit, 0);
    }

    #[test]
    fn history_decodes_timestamps() {
        let record: HistoryRecord = serde_json::from_str(
            r#"{
                "jobName": "nightly-backup",
                "startTimeUTC": "2024-03-01T02:00:00Z",
                "completionTimeUTC": "2024-03-01T02:15:30.5Z",
                "finalStatusCode": 0,
                "historyID": 991
            }"#,
        )
        .unwrap();

        assert_eq!(record.job_name, "nightly-backup");
        assert_eq!(record.start_time.timestamp_millis(), 1_709_258_400_000);
        assert_eq!(
            record.completion_time.map(|t| t.timestamp_millis()),
            Some(1_709_259_330_500)
        );
        assert_eq!(record.history_id, 991);
    }

    #[test]
    fn history_in_progress_has_no_completion() {
        let record: HistoryRecord = serde_json::from_str(
            r#"{"jobName":"running","startTimeUTC":"2024-03-01T02:00:00Z","completionTimeUTC":null,"historyID":5}"#,
        )
        .unwrap();
        assert!(record.completion_time.is_none());
        assert_eq!(record.final_status_code, 0);
    }

    #[test]
    fn token_debug_is_redacted() {
        let token: AccessToken = serde_json::from_str(r#"{"access_token":"s3cr3t"}"#).unwrap();
        assert_eq!(token.secret(), "s3cr3t");
        assert!(!format!("{token:?}").contains("s3cr3t"));
    }
}
