//! Results page preparation: facet refinement and infinite-scroll pagination.

use crate::error::Result;
use jobhound_browser::{BrowserActions, BrowserError, Locator, Pacer};
use jobhound_core::{facets, SearchCriteria};

/// Scrollable list holding the result cards.
pub const RESULTS_CONTAINER: &str = ".job-list-container";
/// Spinner shown inside the container while the next batch loads.
pub const LOADING_INDICATOR: &str = ".loading-wait";
/// Places the facet controls have been seen in, most recent layout first.
pub const FACET_CONTAINERS: &[&str] = &[
    ".filter-wrapper",
    ".search-condition-wrapper",
    ".condition-box",
    ".search-job-condition",
];

/// Why pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStop {
    /// The scroll budget was used up
    MaxScrolls,
    /// No loading indicator appeared, so there is nothing more to load
    IndicatorAbsent,
    /// The indicator appeared but did not go away in time
    LoadStalled,
    /// The container did not grow since the previous measurement
    ExtentStable,
}

/// Result of [`SearchNavigator::paginate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOutcome {
    /// Wheel scrolls performed
    pub scrolls: u32,
    /// What ended the loop
    pub stop: PaginationStop,
}

/// Drives the results page into a fully loaded state.
#[derive(Debug, Clone)]
pub struct SearchNavigator {
    pacer: Pacer,
    element_timeout_ms: u64,
}

impl SearchNavigator {
    /// Create a navigator bounding every element wait by `element_timeout_ms`.
    #[must_use]
    pub fn new(pacer: Pacer, element_timeout_ms: u64) -> Self {
        Self {
            pacer,
            element_timeout_ms,
        }
    }

    /// Click the on-page control of every facet the criteria set.
    ///
    /// Best effort: URL parameters stay authoritative, so unknown codes and
    /// missing controls are logged and skipped.
    pub async fn apply_ui_facets<D>(&self, driver: &D, criteria: &SearchCriteria)
    where
        D: BrowserActions + ?Sized,
    {
        let container = match self.facet_container(driver).await {
            Ok(Some(container)) => container,
            Ok(None) => {
                tracing::debug!("No facet container on page, relying on URL parameters");
                return;
            }
            Err(e) => {
                tracing::debug!("Facet container lookup failed: {}", e);
                return;
            }
        };

        for (kind, code) in criteria.facets() {
            let Some(label) = facets::facet_label(kind, code) else {
                tracing::warn!("Unknown {} code '{}', skipping on-page refinement", kind, code);
                continue;
            };

            match self.click_option(driver, label).await {
                Ok(true) => tracing::debug!("Applied {} facet '{}'", kind, label),
                Ok(false) => tracing::debug!("No control for {} facet '{}'", kind, label),
                Err(e) => tracing::debug!("Applying {} facet '{}' failed: {}", kind, label, e),
            }
        }
    }

    async fn facet_container<D>(&self, driver: &D) -> Result<Option<Locator>>
    where
        D: BrowserActions + ?Sized,
    {
        for selector in FACET_CONTAINERS {
            let candidate = Locator::css(*selector);
            if driver.count(&candidate).await? > 0 && driver.is_visible(&candidate.first()).await? {
                return Ok(Some(candidate.first()));
            }
        }
        Ok(None)
    }

    async fn click_option<D>(&self, driver: &D, label: &str) -> Result<bool>
    where
        D: BrowserActions + ?Sized,
    {
        let option = Locator::text(label);
        if driver.count(&option).await? == 0 {
            return Ok(false);
        }
        driver.click(&option.first(), self.pacer.click_delay_ms()).await?;
        self.pacer.pause(&self.pacer.config().facet_refresh).await;
        self.pacer.pause(&self.pacer.config().facet_dwell).await;
        Ok(true)
    }

    /// Scroll the results list until it stops growing, at most `max_scrolls` times.
    ///
    /// Each iteration measures the container, wheels by the growth since the
    /// last measurement and waits for the loading indicator to appear and then
    /// disappear. An indicator that never shows, or a container that did not
    /// grow, ends the loop early.
    pub async fn paginate<D>(&self, driver: &D, max_scrolls: u32) -> Result<PaginationOutcome>
    where
        D: BrowserActions + ?Sized,
    {
        let container = Locator::css(RESULTS_CONTAINER);
        driver
            .wait_visible(&container, self.element_timeout_ms)
            .await?;
        driver.hover(&container).await?;
        self.pacer.pause(&self.pacer.config().results_dwell).await;

        let indicator = container.locate(LOADING_INDICATOR);
        let mut previous = 0.0_f64;

        for scroll in 1..=max_scrolls {
            let extent = driver.extent(&container).await?;
            driver.scroll(extent - previous).await?;
            self.pacer.pause(&self.pacer.config().scroll_dwell).await;

            if let Some(stop) = self.await_load(driver, &indicator).await? {
                tracing::debug!("Pagination stopped after {} scroll(s): {:?}", scroll, stop);
                return Ok(PaginationOutcome { scrolls: scroll, stop });
            }
            self.pacer.pause(&self.pacer.config().after_load).await;

            if extent > previous {
                previous = extent;
            } else {
                tracing::debug!("Results stopped growing at {}px", extent);
                return Ok(PaginationOutcome {
                    scrolls: scroll,
                    stop: PaginationStop::ExtentStable,
                });
            }
        }

        Ok(PaginationOutcome {
            scrolls: max_scrolls,
            stop: PaginationStop::MaxScrolls,
        })
    }

    async fn await_load<D>(&self, driver: &D, indicator: &Locator) -> Result<Option<PaginationStop>>
    where
        D: BrowserActions + ?Sized,
    {
        match driver.wait_visible(indicator, self.element_timeout_ms).await {
            Ok(()) => {}
            Err(BrowserError::Timeout(_)) => return Ok(Some(PaginationStop::IndicatorAbsent)),
            Err(e) => return Err(e.into()),
        }
        match driver.wait_hidden(indicator, self.element_timeout_ms).await {
            Ok(()) => Ok(None),
            Err(BrowserError::Timeout(_)) => Ok(Some(PaginationStop::LoadStalled)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobhound_browser::{RecordingClock, ReplayDriver};
    use jobhound_core::PacingConfig;
    use std::sync::Arc;
    use std::time::Duration;

    const URL: &str = "https://www.zhipin.com/web/geek/jobs";

    fn card(n: usize) -> String {
        format!(r#"<div class="job-card-box"><a class="job-name">job {n}</a></div>"#)
    }

    fn page(cards: usize) -> String {
        let cards: String = (0..cards).map(card).collect();
        format!(
            r#"<div class="job-list-container">{cards}<!-- more --><div class="loading-wait" data-while-loading></div></div>"#
        )
    }

    fn navigator() -> (SearchNavigator, RecordingClock) {
        let clock = RecordingClock::new();
        let pacer = Pacer::with_clock(PacingConfig::default(), Arc::new(clock.clone()));
        (SearchNavigator::new(pacer, 100), clock)
    }

    #[tokio::test]
    async fn test_stops_when_indicator_never_appears() {
        let driver = ReplayDriver::new().with_page(URL, page(3)).with_batches(
            URL,
            vec![card(3) + &card(4), card(5)],
        );
        driver.navigate(URL).await.unwrap();
        let (navigator, _) = navigator();

        let outcome = navigator.paginate(&driver, 10).await.unwrap();

        // Two batches load, the third scroll finds nothing more
        assert_eq!(outcome, PaginationOutcome { scrolls: 3, stop: PaginationStop::IndicatorAbsent });
        // Container holds the spinner plus the cards: 4, 6, 7 children
        assert_eq!(driver.scrolls(), vec![400.0, 200.0, 100.0]);
    }

    #[tokio::test]
    async fn test_respects_scroll_budget() {
        let batches = (0..10).map(card).collect();
        let driver = ReplayDriver::new().with_page(URL, page(2)).with_batches(URL, batches);
        driver.navigate(URL).await.unwrap();
        let (navigator, clock) = navigator();

        let outcome = navigator.paginate(&driver, 4).await.unwrap();

        assert_eq!(outcome, PaginationOutcome { scrolls: 4, stop: PaginationStop::MaxScrolls });
        assert_eq!(driver.scrolls().len(), 4);
        // results dwell, then scroll dwell and after-load per scroll
        assert_eq!(clock.pauses().len(), 1 + 4 * 2);
        assert!(clock.pauses()[0] >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_stops_when_extent_stable() {
        let fixed = r#"<div class="job-list-container" data-extent="900"><!-- more --><div class="loading-wait" data-while-loading></div></div>"#;
        let driver = ReplayDriver::new()
            .with_page(URL, fixed)
            .with_batches(URL, vec![card(0), card(1), card(2)]);
        driver.navigate(URL).await.unwrap();
        let (navigator, _) = navigator();

        let outcome = navigator.paginate(&driver, 8).await.unwrap();

        assert_eq!(outcome, PaginationOutcome { scrolls: 2, stop: PaginationStop::ExtentStable });
        assert_eq!(driver.scrolls(), vec![900.0, 0.0]);
    }

    #[tokio::test]
    async fn test_zero_scrolls_still_hovers() {
        let driver = ReplayDriver::new().with_page(URL, page(1));
        driver.navigate(URL).await.unwrap();
        let (navigator, _) = navigator();

        let outcome = navigator.paginate(&driver, 0).await.unwrap();
        assert_eq!(outcome.scrolls, 0);
        assert!(driver.scrolls().is_empty());
        assert_eq!(driver.hovers(), vec![RESULTS_CONTAINER]);
    }

    #[tokio::test]
    async fn test_missing_container_times_out() {
        let driver = ReplayDriver::new().with_page(URL, "<p>验证码</p>");
        driver.navigate(URL).await.unwrap();
        let (navigator, _) = navigator();

        let err = navigator.paginate(&driver, 3).await.unwrap_err();
        assert!(err.is_card_level());
    }

    #[tokio::test]
    async fn test_ui_facets_click_known_labels() {
        let filters = r#"<div class="filter-wrapper">
            <ul><li>20K-30K</li><li>30K-50K</li></ul>
            <ul><li>本科</li><li>硕士</li></ul>
        </div>"#;
        let driver = ReplayDriver::new().with_page(URL, filters);
        driver.navigate(URL).await.unwrap();
        let (navigator, clock) = navigator();

        let criteria = SearchCriteria::new("rust", "101010100")
            .unwrap()
            .with_salary("105")
            .with_experience("999")
            .with_degree("206");
        navigator.apply_ui_facets(&driver, &criteria).await;

        assert_eq!(
            driver.clicks(),
            vec!["text=\"20K-30K\" >> nth=0", "text=\"硕士\" >> nth=0"]
        );
        // facet refresh + dwell for each applied facet
        assert_eq!(clock.pauses().len(), 4);
        assert_eq!(clock.pauses()[0], Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_ui_facets_without_container_is_noop() {
        let driver = ReplayDriver::new().with_page(URL, "<li>本科</li>");
        driver.navigate(URL).await.unwrap();
        let (navigator, _) = navigator();

        let criteria = SearchCriteria::new("rust", "101010100").unwrap().with_degree("205");
        navigator.apply_ui_facets(&driver, &criteria).await;
        assert!(driver.clicks().is_empty());
    }
}
