use crate::actions::{extract_domain, BrowserActions, BrowserCookie};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use crate::locator::Locator;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, SetUserAgentOverrideParams, TimeSinceEpoch,
};
use chromiumoxide::layout::Point;
use chromiumoxide::Page;
use futures::StreamExt;
use jobhound_core::BrowserConfig;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Resolves a serialized locator against the live DOM and applies `op` to the
/// result. Mirrors the step semantics of [`Locator`].
const RESOLVER: &str = r"(steps, op, arg) => {
  let nodes = [document];
  for (const step of steps) {
    if (step.css !== undefined) {
      const found = new Set();
      for (const n of nodes) for (const e of n.querySelectorAll(step.css)) found.add(e);
      nodes = [...found];
    } else if (step.nth !== undefined) {
      nodes = step.nth < nodes.length ? [nodes[step.nth]] : [];
    } else if (step.text !== undefined) {
      const found = new Set();
      for (const n of nodes) {
        for (const e of n.querySelectorAll('*')) {
          if (e.textContent.trim() !== step.text) continue;
          if ([...e.children].some(c => c.textContent.trim() === step.text)) continue;
          found.add(e);
        }
      }
      nodes = [...found];
    }
  }
  const visible = e => {
    if (!e || !e.isConnected) return false;
    const s = getComputedStyle(e);
    if (s.display === 'none' || s.visibility === 'hidden') return false;
    const r = e.getBoundingClientRect();
    return r.width > 0 && r.height > 0;
  };
  const el = nodes[0];
  switch (op) {
    case 'count': return nodes.length;
    case 'visible': return visible(el);
    case 'any_visible': return nodes.some(visible);
    case 'text': return el ? el.innerText : null;
    case 'attribute':
      return el ? { found: el.hasAttribute(arg), value: el.getAttribute(arg) } : null;
    case 'extent': return el ? el.getBoundingClientRect().height : null;
    case 'center': {
      if (!el) return null;
      el.scrollIntoView({ block: 'center', inline: 'center' });
      const r = el.getBoundingClientRect();
      return [r.x + r.width / 2, r.y + r.height / 2];
    }
    default: return null;
  }
}";

/// Scripts returning `null` produce no value over CDP, so results are boxed.
#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct Boxed<T> {
    #[serde(default)]
    v: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AttributeProbe {
    found: bool,
    value: Option<String>,
}

/// Minimum spacing between navigations to the same domain.
///
/// Unlike a hard rate limit, a navigation that comes too early is delayed
/// until its turn instead of being rejected.
#[derive(Debug)]
struct NavigationThrottle {
    last_access: HashMap<String, Instant>,
    min_delay: Duration,
}

impl NavigationThrottle {
    fn new(min_delay_ms: u64) -> Self {
        Self {
            last_access: HashMap::new(),
            min_delay: Duration::from_millis(min_delay_ms),
        }
    }

    async fn wait_turn(&mut self, domain: &str) {
        if let Some(last) = self.last_access.get(domain) {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let wait = self.min_delay - elapsed;
                tracing::debug!("Throttling navigation to {} for {:?}", domain, wait);
                tokio::time::sleep(wait).await;
            }
        }
        self.last_access.insert(domain.to_string(), Instant::now());
    }
}

/// Browser automation engine driving a real Chromium over CDP.
pub struct BrowserEngine {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    fingerprint: FingerprintConfig,
    throttle: Mutex<NavigationThrottle>,
    pointer: StdMutex<(f64, f64)>,
    navigation_timeout: Duration,
}

impl BrowserEngine {
    /// Launch a browser with a randomized fingerprint.
    pub async fn new(config: &BrowserConfig) -> Result<Self> {
        Self::launch(config, FingerprintConfig::randomized()).await
    }

    /// Launch a browser presenting the given fingerprint.
    pub async fn launch(config: &BrowserConfig, fingerprint: FingerprintConfig) -> Result<Self> {
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .viewport(None)
            .arg("--disable-blink-features=AutomationControlled");
        if !config.headless {
            builder = builder.with_head();
        }
        let chrome_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(chrome_config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        page.set_user_agent(SetUserAgentOverrideParams::new(fingerprint.user_agent.clone()))
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        tracing::info!(
            "Browser launched (headless: {}, window: {}x{})",
            config.headless,
            fingerprint.viewport_width,
            fingerprint.viewport_height
        );

        let centre = (
            f64::from(fingerprint.viewport_width) / 2.0,
            f64::from(fingerprint.viewport_height) / 2.0,
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            fingerprint,
            throttle: Mutex::new(NavigationThrottle::new(config.min_navigation_interval_ms)),
            pointer: StdMutex::new(centre),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        })
    }

    /// The identity this browser presents.
    #[must_use]
    pub fn fingerprint(&self) -> &FingerprintConfig {
        &self.fingerprint
    }

    /// Close the browser process.
    pub async fn close(&self) -> Result<()> {
        self.browser
            .lock()
            .await
            .close()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(())
    }

    async fn evaluate<T: DeserializeOwned>(
        &self,
        locator: &Locator,
        op: &str,
        arg: Option<&str>,
    ) -> Result<Option<T>> {
        let steps = serde_json::to_string(locator).map_err(|e| BrowserError::InvalidLocator {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;
        let arg = serde_json::to_string(&arg).map_err(|e| BrowserError::ScriptError(e.to_string()))?;
        let op = serde_json::to_string(op).map_err(|e| BrowserError::ScriptError(e.to_string()))?;
        let script = format!("({{ v: ({RESOLVER})({steps}, {op}, {arg}) }})");

        let boxed: Boxed<T> = self
            .page
            .evaluate_expression(script)
            .await
            .map_err(|e| BrowserError::ScriptError(e.to_string()))?
            .into_value()
            .map_err(|e| BrowserError::ScriptError(format!("{locator}: {e}")))?;
        Ok(boxed.v)
    }

    async fn probe<T: DeserializeOwned>(&self, locator: &Locator, op: &str) -> Result<T> {
        self.evaluate(locator, op, None)
            .await?
            .ok_or_else(|| BrowserError::ScriptError(format!("{locator}: no result for {op}")))
    }

    async fn center(&self, locator: &Locator) -> Result<Point> {
        let center: Option<(f64, f64)> = self.evaluate(locator, "center", None).await?;
        let (x, y) = center.ok_or_else(|| BrowserError::SelectorNotFound(locator.to_string()))?;
        Ok(Point::new(x, y))
    }

    async fn mouse_event(&self, kind: DispatchMouseEventType, point: Point) -> Result<()> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(point.x)
            .y(point.y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(BrowserError::ChromiumError)?;
        self.page
            .execute(params)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(())
    }

    async fn pointer_to(&self, point: Point) -> Result<()> {
        self.page
            .move_mouse(point)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        if let Ok(mut pointer) = self.pointer.lock() {
            *pointer = (point.x, point.y);
        }
        Ok(())
    }

    async fn poll_until(&self, locator: &Locator, op: &str, want: bool, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let state: bool = self.probe(locator, op).await?;
            if state == want {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "{locator} after {timeout_ms}ms"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

impl Drop for BrowserEngine {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait::async_trait]
impl BrowserActions for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        let domain = extract_domain(url)?;
        self.throttle.lock().await.wait_turn(&domain).await;

        tracing::debug!("Navigating to {}", url);
        tokio::time::timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| {
                BrowserError::NavigationError(format!(
                    "{url} did not load within {:?}",
                    self.navigation_timeout
                ))
            })?
            .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        self.probe(locator, "count").await
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        self.probe(locator, "visible").await
    }

    async fn wait_visible(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.poll_until(locator, "visible", true, timeout_ms).await
    }

    async fn wait_hidden(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.poll_until(locator, "any_visible", false, timeout_ms).await
    }

    async fn text(&self, locator: &Locator) -> Result<String> {
        let text: Option<String> = self.evaluate(locator, "text", None).await?;
        text.ok_or_else(|| BrowserError::SelectorNotFound(locator.to_string()))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let probe: Option<AttributeProbe> = self.evaluate(locator, "attribute", Some(name)).await?;
        let probe = probe.ok_or_else(|| BrowserError::SelectorNotFound(locator.to_string()))?;
        Ok(if probe.found { probe.value } else { None })
    }

    async fn click(&self, locator: &Locator, delay_ms: u64) -> Result<()> {
        let point = self.center(locator).await?;
        self.pointer_to(point).await?;
        self.mouse_event(DispatchMouseEventType::MousePressed, point).await?;
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        self.mouse_event(DispatchMouseEventType::MouseReleased, point).await
    }

    async fn hover(&self, locator: &Locator) -> Result<()> {
        let point = self.center(locator).await?;
        self.pointer_to(point).await
    }

    async fn extent(&self, locator: &Locator) -> Result<f64> {
        let extent: Option<f64> = self.evaluate(locator, "extent", None).await?;
        extent.ok_or_else(|| BrowserError::SelectorNotFound(locator.to_string()))
    }

    async fn scroll(&self, delta_y: f64) -> Result<()> {
        let (x, y) = self.pointer.lock().map(|p| *p).unwrap_or((0.0, 0.0));
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseWheel)
            .x(x)
            .y(y)
            .delta_x(0.0)
            .delta_y(delta_y)
            .build()
            .map_err(BrowserError::ChromiumError)?;
        self.page
            .execute(params)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        Ok(cookies
            .into_iter()
            .map(|c| BrowserCookie {
                expires: (!c.session && c.expires > 0.0).then_some(c.expires),
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                http_only: c.http_only,
                secure: c.secure,
            })
            .collect())
    }

    async fn set_cookies(&self, cookies: &[BrowserCookie]) -> Result<()> {
        let mut params = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            let mut builder = CookieParam::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone())
                .domain(cookie.domain.clone())
                .path(cookie.path.clone())
                .http_only(cookie.http_only)
                .secure(cookie.secure);
            if let Some(expires) = cookie.expires {
                builder = builder.expires(TimeSinceEpoch::new(expires));
            }
            params.push(builder.build().map_err(BrowserError::ChromiumError)?);
        }

        self.page
            .set_cookies(params)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(())
    }

    async fn viewport(&self) -> Result<Option<(u32, u32)>> {
        let size: Option<(u32, u32)> = self
            .page
            .evaluate_expression("[window.innerWidth, window.innerHeight]")
            .await
            .map_err(|e| BrowserError::ScriptError(e.to_string()))?
            .into_value()
            .ok();
        Ok(size.or(Some(self.fingerprint.viewport())))
    }

    async fn move_pointer(&self, x: f64, y: f64) -> Result<()> {
        self.pointer_to(Point::new(x, y)).await
    }
}
