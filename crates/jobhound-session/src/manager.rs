//! Login state machine.
//!
//! ```text
//! NotLoggedIn ──QR delivered──▶ AwaitingUserAction
//!      │                               │
//!      └────marker visible──▶ LoggedIn ◀┘
//!      └────polls exhausted─▶ TimedOut
//! ```

use crate::credential::CredentialStore;
use crate::error::Result;
use crate::qrcode::QrCodeSink;
use jobhound_browser::{BrowserActions, BrowserError, Locator, Pacer};
use jobhound_core::{absolutize_url, SessionConfig};
use std::fmt;
use std::sync::Arc;

/// Element present only for an authenticated user.
pub const AUTH_MARKER: &str = ".nav-figure";
/// Button that swaps the password form for a QR code.
pub const QR_REVEAL: &str = ".wx-login-btn";
/// The QR code image.
pub const QR_IMAGE: &str = ".mini-qrcode";

/// Login page of the target site.
#[must_use]
pub fn login_url(base_url: &str) -> String {
    format!("{}/web/user/?ka=header-login", base_url.trim_end_matches('/'))
}

/// Where the login flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// No marker seen and no QR code delivered yet
    NotLoggedIn,
    /// A QR code was delivered and awaits a scan
    AwaitingUserAction,
    /// The authenticated marker is visible
    LoggedIn,
    /// Polls ran out
    TimedOut,
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoggedIn => write!(f, "not logged in"),
            Self::AwaitingUserAction => write!(f, "awaiting user action"),
            Self::LoggedIn => write!(f, "logged in"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Establishes an authenticated browsing session.
pub struct SessionManager {
    config: SessionConfig,
    base_url: String,
    store: CredentialStore,
    pacer: Pacer,
    sink: Option<Arc<dyn QrCodeSink>>,
    state: LoginState,
    last_qr: Option<String>,
}

impl SessionManager {
    /// Create a manager for the site at `base_url`, storing cookies at
    /// `config.cookies_path`.
    pub fn new(config: SessionConfig, base_url: impl Into<String>, pacer: Pacer) -> Self {
        let store = CredentialStore::new(config.cookies_path.clone());
        Self {
            config,
            base_url: base_url.into(),
            store,
            pacer,
            sink: None,
            state: LoginState::NotLoggedIn,
            last_qr: None,
        }
    }

    /// Run unattended: reveal the QR code and hand it to `sink`.
    #[must_use]
    pub fn with_qr_sink(mut self, sink: Arc<dyn QrCodeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Where the last [`establish`](Self::establish) call ended.
    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Credential persistence used by this manager.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Restore any stored credential, open the login page and poll for the
    /// authenticated marker.
    ///
    /// Returns `true` once logged in, after persisting the refreshed cookies.
    /// Running out of polls is not an error: it returns `false`.
    pub async fn establish<D>(&mut self, driver: &D) -> Result<bool>
    where
        D: BrowserActions + ?Sized,
    {
        self.state = LoginState::NotLoggedIn;
        self.last_qr = None;

        if let Some(credential) = self.store.load().await {
            driver.set_cookies(&credential.cookies).await?;
            tracing::info!("Restored {} stored cookies", credential.cookies.len());
        }

        driver.navigate(&login_url(&self.base_url)).await?;

        for attempt in 1..=self.config.max_polls {
            self.state = self.poll(driver).await?;
            if self.state == LoginState::LoggedIn {
                tracing::info!("Logged in after {} poll(s)", attempt);
                let cookies = driver.cookies().await?;
                self.store.save(cookies).await?;
                return Ok(true);
            }
        }

        self.state = LoginState::TimedOut;
        tracing::warn!(
            "Not logged in after {} polls, giving up",
            self.config.max_polls
        );
        Ok(false)
    }

    /// One transition of the state machine.
    async fn poll<D>(&mut self, driver: &D) -> Result<LoginState>
    where
        D: BrowserActions + ?Sized,
    {
        let marker = Locator::css(AUTH_MARKER);
        match driver
            .wait_visible(&marker, self.config.poll_interval_ms)
            .await
        {
            Ok(()) => return Ok(LoginState::LoggedIn),
            Err(BrowserError::Timeout(_)) => {}
            Err(e) => return Err(e.into()),
        }

        if self.sink.is_some() && self.offer_qr_code(driver).await? {
            return Ok(LoginState::AwaitingUserAction);
        }
        Ok(self.state)
    }

    /// Reveal the QR code and deliver it if it changed. Returns whether a new
    /// code was delivered.
    async fn offer_qr_code<D>(&mut self, driver: &D) -> Result<bool>
    where
        D: BrowserActions + ?Sized,
    {
        let Some(sink) = self.sink.clone() else {
            return Ok(false);
        };

        let reveal = Locator::css(QR_REVEAL).first();
        let image = Locator::css(QR_IMAGE).first();
        if driver.is_visible(&reveal).await? {
            driver.click(&reveal, self.pacer.click_delay_ms()).await?;
            match driver.wait_visible(&image, self.config.qr_timeout_ms).await {
                Ok(()) => {}
                Err(BrowserError::Timeout(_)) => return Ok(false),
                Err(e) => return Err(e.into()),
            }
        } else if !driver.is_visible(&image).await? {
            // Nothing to reveal and nothing shown
            return Ok(false);
        }

        let Some(src) = driver.attribute(&image, "src").await? else {
            return Ok(false);
        };
        let src = absolutize_url(&self.base_url, Some(&src));
        if src.is_empty() || self.last_qr.as_deref() == Some(src.as_str()) {
            return Ok(false);
        }

        if let Err(e) = sink.deliver(&src).await {
            tracing::warn!("QR code delivery failed: {}", e);
            return Ok(false);
        }
        tracing::info!("QR code delivered, waiting for scan");
        self.last_qr = Some(src);
        Ok(true)
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.base_url)
            .field("store", &self.store)
            .field("unattended", &self.sink.is_some())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
