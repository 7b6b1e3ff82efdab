use crate::error::{BrowserError, Result};
use crate::locator::Locator;
use serde::{Deserialize, Serialize};

/// A browser cookie as persisted between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Seconds since the epoch; `None` for session cookies
    #[serde(default)]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

/// Browser actions for automation.
///
/// Every call is a suspension point; implementations resolve locators against
/// the current page on each call. Waits are always bounded.
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Number of elements the locator currently matches
    async fn count(&self, locator: &Locator) -> Result<usize>;

    /// Whether the first match exists and is rendered
    async fn is_visible(&self, locator: &Locator) -> Result<bool>;

    /// Wait until the first match is visible
    async fn wait_visible(&self, locator: &Locator, timeout_ms: u64) -> Result<()>;

    /// Wait until no match is visible
    async fn wait_hidden(&self, locator: &Locator, timeout_ms: u64) -> Result<()>;

    /// Rendered text of the first match
    async fn text(&self, locator: &Locator) -> Result<String>;

    /// Attribute of the first match, `None` when the attribute is absent
    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;

    /// Click the first match, holding the button for `delay_ms`
    async fn click(&self, locator: &Locator, delay_ms: u64) -> Result<()>;

    /// Move the pointer over the first match
    async fn hover(&self, locator: &Locator) -> Result<()>;

    /// Rendered height of the first match in CSS pixels
    async fn extent(&self, locator: &Locator) -> Result<f64>;

    /// Dispatch a mouse wheel event at the pointer position
    async fn scroll(&self, delta_y: f64) -> Result<()>;

    /// All cookies of the browsing session
    async fn cookies(&self) -> Result<Vec<BrowserCookie>>;

    /// Add cookies to the browsing session
    async fn set_cookies(&self, cookies: &[BrowserCookie]) -> Result<()>;

    /// Viewport size as `(width, height)`, if known
    async fn viewport(&self) -> Result<Option<(u32, u32)>>;

    /// Move the pointer to viewport coordinates
    async fn move_pointer(&self, x: f64, y: f64) -> Result<()>;

    /// One locator per current match, in document order
    async fn all(&self, locator: &Locator) -> Result<Vec<Locator>> {
        let count = self.count(locator).await?;
        Ok((0..count).map(|i| locator.nth(i)).collect())
    }

    /// Text of the first match if it is visible, `None` otherwise
    async fn visible_text(&self, locator: &Locator) -> Result<Option<String>> {
        if self.is_visible(locator).await? {
            self.text(locator).await.map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(|s| s.to_string())
}
