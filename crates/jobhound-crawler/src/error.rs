//! Crawl error types.

use jobhound_browser::BrowserError;
use jobhound_core::JobhoundError;
use jobhound_session::SessionError;
use thiserror::Error;

/// Terminal crawl failures.
///
/// Anything recoverable (a missing element on one card, a filter rejection,
/// a failed facet click) is handled inside the pipeline and never surfaces
/// here.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The browser failed outside of a single card
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Login could not run (credential I/O or QR delivery)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The search criteria were rejected
    #[error("Invalid search: {0}")]
    Validation(#[from] JobhoundError),
}

impl CrawlError {
    /// Whether the failure only concerns the card being processed.
    #[must_use]
    pub fn is_card_level(&self) -> bool {
        matches!(self, Self::Browser(e) if e.is_element_level())
    }
}

/// Result type for crawl operations.
pub type Result<T> = std::result::Result<T, CrawlError>;
