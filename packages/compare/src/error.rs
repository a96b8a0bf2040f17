//! Typed errors for the comparison pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell
//! a retailer-level failure apart from an infrastructure failure.

use thiserror::Error;

/// Errors raised by a browser backend.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The browser (or WebDriver session) could not be started
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// Navigation did not reach DOM-ready in time
    #[error("navigation timed out after {timeout_ms}ms: {url}")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    /// Navigation failed for another reason (DNS, HTTP status, ...)
    #[error("navigation failed for {url}: {reason}")]
    Navigation { url: String, reason: String },

    /// The selector could not be parsed
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// The element handle no longer refers to a live element
    #[error("stale element: {0}")]
    StaleElement(String),

    /// WebDriver returned an error payload
    #[error("webdriver error {error}: {message}")]
    WebDriver { error: String, message: String },

    /// Transport-level failure talking to the backend
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Unexpected response shape
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation attempted on a closed page or browser
    #[error("{0} already closed")]
    Closed(&'static str),
}

impl From<reqwest::Error> for BrowserError {
    fn from(err: reqwest::Error) -> Self {
        BrowserError::Http(Box::new(err))
    }
}

/// Errors that fail a single retailer adapter.
///
/// The aggregator logs these and drops the retailer from the result set.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Browser-level failure while scraping
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// The adapter exceeded its overall time budget
    #[error("adapter {retailer} timed out after {timeout_ms}ms")]
    Timeout { retailer: String, timeout_ms: u64 },
}

/// Errors that fail a whole comparison request.
#[derive(Debug, Error)]
pub enum CompareError {
    /// Browser could not be launched for this request
    #[error("browser unavailable: {0}")]
    Launch(#[source] BrowserError),
}

/// Result type alias for browser operations.
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Result type alias for adapter operations.
pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for comparison requests.
pub type CompareResult<T> = std::result::Result<T, CompareError>;
