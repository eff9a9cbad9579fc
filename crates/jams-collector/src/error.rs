//! Scrape error types.

use jams_api::ApiError;
use thiserror::Error;

pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// Errors that abort a whole scrape.
///
/// Anything below authentication is isolated to its branch and reported
/// through [`ScrapeReport::failures`](crate::ScrapeReport::failures) instead.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("authentication with JAMS failed: {0}")]
    Login(#[source] ApiError),
}
