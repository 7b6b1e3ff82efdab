use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("script evaluation failed: {0}")]
    ScriptError(String),

    #[error("invalid locator {locator}: {reason}")]
    InvalidLocator { locator: String, reason: String },
}

impl BrowserError {
    /// Whether the failure concerns a single element rather than the session.
    ///
    /// Element-level failures are recoverable by skipping the current card;
    /// anything else means the page or browser is no longer usable.
    #[must_use]
    pub fn is_element_level(&self) -> bool {
        matches!(
            self,
            Self::SelectorNotFound(_) | Self::Timeout(_) | Self::InvalidLocator { .. }
        )
    }
}
