//! Offline driver that replays saved HTML.
//!
//! [`ReplayDriver`] answers [`BrowserActions`] calls from static markup, which
//! makes crawls reproducible without a browser. A few `data-*` attributes
//! stand in for the dynamic behaviour of the live site:
//!
//! - `data-opens="key"`: clicking the element (or a descendant) shows the
//!   detail fragment registered under `key`, replacing the previous one.
//! - `data-while-loading`: the element is only visible while a scroll-triggered
//!   load is in flight. A successful wait on it completes the load.
//! - `data-requires-cookie="name"`: the element is only visible once a cookie
//!   with that name is set.
//! - `data-extent="px"`: the element's rendered height. Without it an element
//!   measures 100px per child element.
//!
//! Pages may contain the marker [`MORE_MARKER`]; each scroll splices the next
//! registered batch in front of it.

use crate::actions::{BrowserActions, BrowserCookie};
use crate::error::{BrowserError, Result};
use crate::locator::{Locator, Step};
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Where scroll-loaded batches are spliced into a page.
pub const MORE_MARKER: &str = "<!-- more -->";

const OPENS_ATTR: &str = "data-opens";
const LOADING_ATTR: &str = "data-while-loading";
const COOKIE_ATTR: &str = "data-requires-cookie";
const EXTENT_ATTR: &str = "data-extent";
const ROW_EXTENT: f64 = 100.0;

#[derive(Debug, Clone)]
struct ReplayPage {
    prefix: String,
    html: String,
    batches: Vec<String>,
}

#[derive(Debug, Default)]
struct ReplayState {
    page: String,
    detail: Option<String>,
    pending: VecDeque<String>,
    loading: bool,
    cookies: Vec<BrowserCookie>,
    navigations: Vec<String>,
    clicks: Vec<String>,
    hovers: Vec<String>,
    scrolls: Vec<f64>,
    pointer_moves: Vec<(f64, f64)>,
}

impl ReplayState {
    fn document(&self) -> Html {
        let mut markup = self.page.clone();
        if let Some(detail) = &self.detail {
            markup.push_str(detail);
        }
        Html::parse_document(&markup)
    }

    fn is_hidden(&self, element: &scraper::node::Element) -> bool {
        element.attr("hidden").is_some()
            || element
                .attr("style")
                .is_some_and(|s| s.replace(' ', "").contains("display:none"))
            || (element.attr(LOADING_ATTR).is_some() && !self.loading)
            || element
                .attr(COOKIE_ATTR)
                .is_some_and(|name| !self.cookies.iter().any(|c| c.name == name))
    }

    fn is_visible(&self, element: ElementRef<'_>) -> bool {
        std::iter::once(*element)
            .chain(element.ancestors())
            .filter_map(ElementRef::wrap)
            .all(|e| !self.is_hidden(e.value()))
    }
}

/// [`BrowserActions`] over saved HTML, recording every interaction.
#[derive(Debug)]
pub struct ReplayDriver {
    pages: Vec<ReplayPage>,
    details: HashMap<String, String>,
    viewport: (u32, u32),
    state: Mutex<ReplayState>,
}

impl Default for ReplayDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayDriver {
    /// Create a driver with no pages.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            details: HashMap::new(),
            viewport: (1280, 720),
            state: Mutex::new(ReplayState::default()),
        }
    }

    /// Serve `html` for every URL starting with `prefix`. The longest prefix wins.
    #[must_use]
    pub fn with_page(mut self, prefix: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.push(ReplayPage {
            prefix: prefix.into(),
            html: html.into(),
            batches: Vec::new(),
        });
        self
    }

    /// Markup loaded by successive scrolls on the page registered under `prefix`.
    #[must_use]
    pub fn with_batches(mut self, prefix: &str, batches: Vec<String>) -> Self {
        if let Some(page) = self.pages.iter_mut().find(|p| p.prefix == prefix) {
            page.batches = batches;
        }
        self
    }

    /// Detail fragment shown when an element with `data-opens="key"` is clicked.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, html: impl Into<String>) -> Self {
        self.details.insert(key.into(), html.into());
        self
    }

    /// Cookies present before the first navigation.
    #[must_use]
    pub fn with_cookies(self, cookies: Vec<BrowserCookie>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.cookies = cookies;
        }
        self
    }

    /// URLs navigated to, in order.
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.lock().map(|s| s.navigations.clone()).unwrap_or_default()
    }

    /// Locators clicked, in order.
    #[must_use]
    pub fn clicks(&self) -> Vec<String> {
        self.lock().map(|s| s.clicks.clone()).unwrap_or_default()
    }

    /// Locators hovered, in order.
    #[must_use]
    pub fn hovers(&self) -> Vec<String> {
        self.lock().map(|s| s.hovers.clone()).unwrap_or_default()
    }

    /// Wheel deltas dispatched, in order.
    #[must_use]
    pub fn scrolls(&self) -> Vec<f64> {
        self.lock().map(|s| s.scrolls.clone()).unwrap_or_default()
    }

    /// Pointer positions requested through [`BrowserActions::move_pointer`].
    #[must_use]
    pub fn pointer_moves(&self) -> Vec<(f64, f64)> {
        self.lock().map(|s| s.pointer_moves.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ReplayState>> {
        self.state
            .lock()
            .map_err(|_| BrowserError::ChromiumError("replay state poisoned".to_string()))
    }

    /// Run `f` against a freshly parsed document of the current page.
    ///
    /// Parsing per call keeps the non-`Send` DOM out of every `.await`.
    fn inspect<R>(
        &self,
        locator: &Locator,
        f: impl FnOnce(&mut ReplayState, Vec<ElementRef<'_>>) -> Result<R>,
    ) -> Result<R> {
        let mut state = self.lock()?;
        let document = state.document();
        let matches = resolve(&document, locator)?;
        f(&mut state, matches)
    }

    fn first_match<'a>(locator: &Locator, matches: &[ElementRef<'a>]) -> Result<ElementRef<'a>> {
        matches
            .first()
            .copied()
            .ok_or_else(|| BrowserError::SelectorNotFound(locator.to_string()))
    }
}

fn resolve<'a>(document: &'a Html, locator: &Locator) -> Result<Vec<ElementRef<'a>>> {
    let mut nodes = vec![document.root_element()];

    for step in locator.steps() {
        let mut found: Vec<ElementRef<'a>> = match step {
            Step::Css(css) => {
                let selector = Selector::parse(css).map_err(|e| BrowserError::InvalidLocator {
                    locator: locator.to_string(),
                    reason: format!("{e:?}"),
                })?;
                nodes.iter().flat_map(|n| n.select(&selector)).collect()
            }
            Step::Nth(index) => nodes.get(*index).copied().into_iter().collect(),
            Step::Text(text) => nodes
                .iter()
                .flat_map(|n| n.descendants().skip(1).filter_map(ElementRef::wrap))
                .filter(|e| {
                    element_text(*e) == *text
                        && !e
                            .children()
                            .filter_map(ElementRef::wrap)
                            .any(|c| element_text(c) == *text)
                })
                .collect(),
        };
        let mut seen = HashSet::new();
        found.retain(|e| seen.insert(e.id()));
        nodes = found;
    }

    Ok(nodes)
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait::async_trait]
impl BrowserActions for ReplayDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self
            .pages
            .iter()
            .filter(|p| url.starts_with(&p.prefix))
            .max_by_key(|p| p.prefix.len())
            .ok_or_else(|| BrowserError::NavigationError(format!("no replay page for {url}")))?;

        tracing::debug!("Replaying {} for {}", page.prefix, url);
        let mut state = self.lock()?;
        state.navigations.push(url.to_string());
        state.page.clone_from(&page.html);
        state.pending = page.batches.iter().cloned().collect();
        state.detail = None;
        state.loading = false;
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        self.inspect(locator, |_, matches| Ok(matches.len()))
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        self.inspect(locator, |state, matches| {
            Ok(matches.first().is_some_and(|e| state.is_visible(*e)))
        })
    }

    async fn wait_visible(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.inspect(locator, |state, matches| {
            let element = matches
                .first()
                .filter(|e| state.is_visible(**e))
                .ok_or_else(|| BrowserError::Timeout(format!("{locator} after {timeout_ms}ms")))?;
            if element.value().attr(LOADING_ATTR).is_some() {
                state.loading = false;
            }
            Ok(())
        })
    }

    async fn wait_hidden(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.inspect(locator, |state, matches| {
            if matches.iter().any(|e| state.is_visible(*e)) {
                Err(BrowserError::Timeout(format!("{locator} after {timeout_ms}ms")))
            } else {
                Ok(())
            }
        })
    }

    async fn text(&self, locator: &Locator) -> Result<String> {
        self.inspect(locator, |_, matches| {
            Self::first_match(locator, &matches).map(element_text)
        })
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        self.inspect(locator, |_, matches| {
            let element = Self::first_match(locator, &matches)?;
            Ok(element.value().attr(name).map(ToString::to_string))
        })
    }

    async fn click(&self, locator: &Locator, _delay_ms: u64) -> Result<()> {
        let opens = self.inspect(locator, |state, matches| {
            let element = Self::first_match(locator, &matches)?;
            state.clicks.push(locator.to_string());
            Ok(std::iter::once(*element)
                .chain(element.ancestors())
                .filter_map(ElementRef::wrap)
                .find_map(|e| e.value().attr(OPENS_ATTR).map(ToString::to_string)))
        })?;

        if let Some(key) = opens {
            let detail = self.details.get(&key).cloned();
            if detail.is_none() {
                tracing::warn!("No replay detail registered for {}", key);
            }
            self.lock()?.detail = detail;
        }
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> Result<()> {
        self.inspect(locator, |state, matches| {
            Self::first_match(locator, &matches)?;
            state.hovers.push(locator.to_string());
            Ok(())
        })
    }

    async fn extent(&self, locator: &Locator) -> Result<f64> {
        self.inspect(locator, |_, matches| {
            let element = Self::first_match(locator, &matches)?;
            if let Some(extent) = element.value().attr(EXTENT_ATTR) {
                return extent.parse().map_err(|_| {
                    BrowserError::ScriptError(format!("{locator}: bad {EXTENT_ATTR} {extent}"))
                });
            }
            let rows = element.children().filter_map(ElementRef::wrap).count();
            Ok(f64::from(u32::try_from(rows).unwrap_or(u32::MAX)) * ROW_EXTENT)
        })
    }

    async fn scroll(&self, delta_y: f64) -> Result<()> {
        let mut state = self.lock()?;
        state.scrolls.push(delta_y);
        if state.page.contains(MORE_MARKER) {
            if let Some(batch) = state.pending.pop_front() {
                state.page = state
                    .page
                    .replacen(MORE_MARKER, &format!("{batch}{MORE_MARKER}"), 1);
                state.loading = true;
            }
        }
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        Ok(self.lock()?.cookies.clone())
    }

    async fn set_cookies(&self, cookies: &[BrowserCookie]) -> Result<()> {
        let mut state = self.lock()?;
        for cookie in cookies {
            state
                .cookies
                .retain(|c| !(c.name == cookie.name && c.domain == cookie.domain));
            state.cookies.push(cookie.clone());
        }
        Ok(())
    }

    async fn viewport(&self) -> Result<Option<(u32, u32)>> {
        Ok(Some(self.viewport))
    }

    async fn move_pointer(&self, x: f64, y: f64) -> Result<()> {
        self.lock()?.pointer_moves.push((x, y));
        Ok(())
    }
}
