use async_trait::async_trait;
use jobhound_browser::{
    BrowserActions, BrowserCookie, Locator, Pacer, RecordingClock, ReplayDriver,
};
use jobhound_core::{PacingConfig, SessionConfig};
use jobhound_session::{
    CredentialStore, LoginState, QrCodeSink, SessionError, SessionManager,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const BASE: &str = "https://www.zhipin.com";

const LOGIN_PAGE: &str = r#"<html><body>
  <div class="nav-figure" data-requires-cookie="wt2"><img src="/avatar.png"></div>
  <div class="login-box">
    <a class="wx-login-btn" data-opens="qr">微信登录/注册</a>
  </div>
</body></html>"#;

const QR_FRAGMENT: &str =
    r#"<div class="qrcode-box"><img class="mini-qrcode" src="/wapi/zpweixin/qrcode/getqrcode?content=abc"></div>"#;

fn session_cookie() -> BrowserCookie {
    BrowserCookie {
        name: "wt2".to_string(),
        value: "token".to_string(),
        domain: ".zhipin.com".to_string(),
        path: "/".to_string(),
        expires: None,
        http_only: true,
        secure: true,
    }
}

fn login_driver() -> ReplayDriver {
    ReplayDriver::new()
        .with_page(BASE, LOGIN_PAGE)
        .with_detail("qr", QR_FRAGMENT)
}

fn manager(cookies: &Path, max_polls: u32) -> SessionManager {
    let config = SessionConfig {
        cookies_path: cookies.to_path_buf(),
        max_polls,
        ..SessionConfig::default()
    };
    let pacer = Pacer::with_clock(PacingConfig::default(), Arc::new(RecordingClock::new()));
    SessionManager::new(config, BASE, pacer)
}

/// Stands in for a person scanning the code: records it and logs the browser in.
struct ScanningSink {
    driver: Arc<ReplayDriver>,
    delivered: Mutex<Vec<String>>,
}

#[async_trait]
impl QrCodeSink for ScanningSink {
    async fn deliver(&self, image_ref: &str) -> Result<(), SessionError> {
        self.delivered.lock().unwrap().push(image_ref.to_string());
        self.driver.set_cookies(&[session_cookie()]).await?;
        Ok(())
    }
}

#[tokio::test]
async fn test_stored_cookies_restore_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cookies.json");
    CredentialStore::new(&path)
        .save(vec![session_cookie()])
        .await
        .unwrap();

    let driver = login_driver();
    let mut session = manager(&path, 5);

    assert!(session.establish(&driver).await.unwrap());
    assert_eq!(session.state(), LoginState::LoggedIn);
    assert_eq!(
        driver.navigations(),
        vec!["https://www.zhipin.com/web/user/?ka=header-login"]
    );
    // Attended mode never touches the QR affordance
    assert!(driver.clicks().is_empty());
}

#[tokio::test]
async fn test_polls_exhausted_returns_false() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cookies.json");
    let driver = login_driver();
    let mut session = manager(&path, 3);

    assert!(!session.establish(&driver).await.unwrap());
    assert_eq!(session.state(), LoginState::TimedOut);
    assert!(!path.exists(), "nothing is persisted without a login");
}

#[tokio::test]
async fn test_corrupt_credential_starts_fresh() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cookies.json");
    std::fs::write(&path, "garbage").unwrap();

    let driver = login_driver();
    let mut session = manager(&path, 2);
    assert!(!session.establish(&driver).await.unwrap());
    assert!(driver.cookies().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unattended_login_via_qr_code() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state/cookies.json");
    let driver = Arc::new(login_driver());
    let sink = Arc::new(ScanningSink {
        driver: Arc::clone(&driver),
        delivered: Mutex::new(Vec::new()),
    });

    let mut session = manager(&path, 10).with_qr_sink(sink.clone());
    assert!(session.establish(driver.as_ref()).await.unwrap());

    assert_eq!(
        *sink.delivered.lock().unwrap(),
        vec!["https://www.zhipin.com/wapi/zpweixin/qrcode/getqrcode?content=abc"]
    );
    assert_eq!(driver.clicks(), vec![".wx-login-btn >> nth=0"]);

    let saved = CredentialStore::new(&path).load().await.expect("credential saved");
    assert_eq!(saved.cookies, vec![session_cookie()]);
}

#[tokio::test]
async fn test_unattended_without_scan_delivers_once() {
    struct CountingSink(Mutex<usize>);

    #[async_trait]
    impl QrCodeSink for CountingSink {
        async fn deliver(&self, _image_ref: &str) -> Result<(), SessionError> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    let dir = TempDir::new().unwrap();
    let driver = login_driver();
    let sink = Arc::new(CountingSink(Mutex::new(0)));
    let mut session = manager(&dir.path().join("cookies.json"), 4).with_qr_sink(sink.clone());

    assert!(!session.establish(&driver).await.unwrap());
    assert_eq!(session.state(), LoginState::TimedOut);
    assert_eq!(*sink.0.lock().unwrap(), 1);
}

/// Adds up every bounded wait the session asks the browser for.
struct WaitBudget {
    inner: ReplayDriver,
    waited_ms: Mutex<u64>,
}

impl WaitBudget {
    fn new(inner: ReplayDriver) -> Self {
        Self {
            inner,
            waited_ms: Mutex::new(0),
        }
    }

    fn waited_ms(&self) -> u64 {
        *self.waited_ms.lock().unwrap()
    }
}

#[async_trait]
impl BrowserActions for WaitBudget {
    async fn navigate(&self, url: &str) -> jobhound_browser::Result<()> {
        self.inner.navigate(url).await
    }

    async fn count(&self, locator: &Locator) -> jobhound_browser::Result<usize> {
        self.inner.count(locator).await
    }

    async fn is_visible(&self, locator: &Locator) -> jobhound_browser::Result<bool> {
        self.inner.is_visible(locator).await
    }

    async fn wait_visible(&self, locator: &Locator, timeout_ms: u64) -> jobhound_browser::Result<()> {
        *self.waited_ms.lock().unwrap() += timeout_ms;
        self.inner.wait_visible(locator, timeout_ms).await
    }

    async fn wait_hidden(&self, locator: &Locator, timeout_ms: u64) -> jobhound_browser::Result<()> {
        *self.waited_ms.lock().unwrap() += timeout_ms;
        self.inner.wait_hidden(locator, timeout_ms).await
    }

    async fn text(&self, locator: &Locator) -> jobhound_browser::Result<String> {
        self.inner.text(locator).await
    }

    async fn attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> jobhound_browser::Result<Option<String>> {
        self.inner.attribute(locator, name).await
    }

    async fn click(&self, locator: &Locator, delay_ms: u64) -> jobhound_browser::Result<()> {
        self.inner.click(locator, delay_ms).await
    }

    async fn hover(&self, locator: &Locator) -> jobhound_browser::Result<()> {
        self.inner.hover(locator).await
    }

    async fn extent(&self, locator: &Locator) -> jobhound_browser::Result<f64> {
        self.inner.extent(locator).await
    }

    async fn scroll(&self, delta_y: f64) -> jobhound_browser::Result<()> {
        self.inner.scroll(delta_y).await
    }

    async fn cookies(&self) -> jobhound_browser::Result<Vec<BrowserCookie>> {
        self.inner.cookies().await
    }

    async fn set_cookies(&self, cookies: &[BrowserCookie]) -> jobhound_browser::Result<()> {
        self.inner.set_cookies(cookies).await
    }

    async fn viewport(&self) -> jobhound_browser::Result<Option<(u32, u32)>> {
        self.inner.viewport().await
    }

    async fn move_pointer(&self, x: f64, y: f64) -> jobhound_browser::Result<()> {
        self.inner.move_pointer(x, y).await
    }
}

#[tokio::test]
async fn test_unattended_login_without_qr_button_waits_only_poll_interval() {
    struct SilentSink;

    #[async_trait]
    impl QrCodeSink for SilentSink {
        async fn deliver(&self, _image_ref: &str) -> Result<(), SessionError> {
            panic!("no QR code is on the page");
        }
    }

    let dir = TempDir::new().unwrap();
    let driver = WaitBudget::new(ReplayDriver::new().with_page(
        BASE,
        r#"<html><body><form class="pwd-login"><input name="phone"></form></body></html>"#,
    ));
    let polls = 6;
    let mut session =
        manager(&dir.path().join("cookies.json"), polls).with_qr_sink(Arc::new(SilentSink));

    assert!(!session.establish(&driver).await.unwrap());
    assert_eq!(session.state(), LoginState::TimedOut);

    let interval = SessionConfig::default().poll_interval_ms;
    assert_eq!(driver.waited_ms(), u64::from(polls) * interval);
    assert!(driver.inner.clicks().is_empty());
}
