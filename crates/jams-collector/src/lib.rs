//! jams-collector — one scrape cycle against a JAMS server.
//!
//! Walks the folder tree, enumerates jobs per folder, fetches the latest run
//! per job, and records everything into a fresh [`GaugeSnapshot`]. The
//! snapshot is only handed back once every spawned task has been joined.
//!
//! # Architecture
//!
//! ```text
//! Scraper::scrape()
//!   ├── login()                       ← fatal on failure
//!   ├── agents task ─────────────────→ agent gauges
//!   ├── walker::walk(ROOT)            ← one task per child folder, recursive
//!   │     └── per folder task
//!   │           ├── jobs::jobs_of()   → job total
//!   │           └── per job task
//!   │                 └── jobs::latest_history_of() → per-job gauges
//!   └── join barrier → scrape duration → ScrapeReport
//! ```
//!
//! Every collaborator call goes through [`ScrapeContext`], which applies the
//! optional concurrency cap and the scrape's cancellation token, and records
//! branch failures instead of propagating them.
//!
//! [`GaugeSnapshot`]: jams_metrics::GaugeSnapshot

pub mod context;
pub mod error;
pub mod jobs;
pub mod scraper;
pub mod walker;

pub use context::{Branch, BranchFailure, ScrapeContext};
pub use error::{ScrapeError, ScrapeResult};
pub use scraper::{JobCountMode, ScrapeOptions, ScrapeReport, Scraper};
