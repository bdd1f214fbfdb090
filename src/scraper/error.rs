use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Cloneable so one failed walk can be reported to every caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[source] Arc<reqwest::Error>),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("walk did not finish within {0:?}")]
    Timeout(Duration),

    #[error("invalid selector {selector}: {reason}")]
    Selector { selector: String, reason: String },
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        ScrapeError::Http(Arc::new(e))
    }
}

impl ScrapeError {
    /// Transport failures, throttling and server-side errors are worth another try.
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::Http(_) => true,
            ScrapeError::Status { status, .. } => *status == 429 || *status >= 500,
            ScrapeError::Timeout(_) | ScrapeError::Selector { .. } => false,
        }
    }
}
