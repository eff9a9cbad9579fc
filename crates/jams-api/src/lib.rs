//! jams-api — client for the JAMS scheduler REST API.
//!
//! Exposes the five calls the exporter needs behind the [`JamsApi`] trait so
//! the collection pipeline can be driven by the real HTTP client or by an
//! in-memory fixture.
//!
//! # Endpoints
//!
//! | Call | Method | Path |
//! |---|---|---|
//! | `login` | POST | `/jams/api/authentication/login` |
//! | `list_agents` | GET | `/jams/api/agent` |
//! | `list_subfolders` | GET | `/jams/api/folder/children?id={id}` |
//! | `list_jobs` | GET | `/jams/api/job/folder/{id}` |
//! | `latest_history` | GET | `/jams/api/history/job/{id}` |
//!
//! Every call except `login` is authenticated with the bearer token that
//! `login` returns. Nothing is retried.

pub mod api;
pub mod client;
pub mod error;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use api::JamsApi;
pub use client::{JamsClient, JamsClientBuilder};
pub use error::{ApiError, ApiResult};
pub use types::*;

pub use reqwest::StatusCode;
