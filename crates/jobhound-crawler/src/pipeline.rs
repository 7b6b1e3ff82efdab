//! The end-to-end crawl as a lazy stream of records.
//!
//! Nothing happens until the first record is requested. The first request
//! logs in, opens the search page and paginates; every later request works
//! through the collected cards until one survives all filters. Dropping the
//! pipeline (or the stream made from it) drops the driver and with it the
//! browser.

use crate::error::{CrawlError, Result};
use crate::extractor::{ListingExtractor, CARD};
use crate::filter::{FilterChain, Verdict};
use crate::navigator::{SearchNavigator, RESULTS_CONTAINER};
use crate::url_builder::build_search_url;
use futures::stream::{self, Stream};
use jobhound_browser::{BrowserActions, Locator, Pacer};
use jobhound_core::{AppConfig, JobRecord, SearchCriteria};
use jobhound_session::{QrCodeSink, SessionManager};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Counters for one crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Cards found after pagination
    pub cards: usize,
    /// Records yielded
    pub accepted: usize,
    /// Cards dropped by a filter
    pub rejected: usize,
    /// Cards skipped because an element was missing or too slow
    pub abandoned: usize,
}

#[derive(Debug)]
enum Phase {
    Pending,
    Listing { cards: Vec<Locator>, next: usize },
    Finished,
}

enum Step {
    Start,
    Card(Locator),
    Exhausted,
}

/// One crawl over one browsing session.
pub struct CrawlPipeline<D> {
    driver: D,
    criteria: SearchCriteria,
    base_url: String,
    session: SessionManager,
    navigator: SearchNavigator,
    extractor: ListingExtractor,
    phase: Phase,
    stats: CrawlStats,
    span: tracing::Span,
}

impl<D: BrowserActions> CrawlPipeline<D> {
    /// Create a pipeline pausing on the tokio timer.
    pub fn new(driver: D, criteria: SearchCriteria, config: &AppConfig) -> Self {
        Self::with_pacer(driver, criteria, config, Pacer::new(config.pacing.clone()))
    }

    /// Create a pipeline with a custom pacer.
    pub fn with_pacer(driver: D, criteria: SearchCriteria, config: &AppConfig, pacer: Pacer) -> Self {
        let base_url = config.browser.base_url.trim_end_matches('/').to_string();
        let timeout = config.browser.element_timeout_ms;
        let span = tracing::info_span!(
            "crawl",
            id = %Uuid::new_v4(),
            query = %criteria.query(),
            city = %criteria.city_code(),
        );

        Self {
            driver,
            session: SessionManager::new(config.session.clone(), base_url.clone(), pacer.clone()),
            navigator: SearchNavigator::new(pacer.clone(), timeout),
            extractor: ListingExtractor::new(pacer, base_url.clone(), timeout),
            criteria,
            base_url,
            phase: Phase::Pending,
            stats: CrawlStats::default(),
            span,
        }
    }

    /// Deliver login QR codes to `sink` instead of waiting for a manual login.
    #[must_use]
    pub fn with_qr_sink(mut self, sink: Arc<dyn QrCodeSink>) -> Self {
        self.session = self.session.with_qr_sink(sink);
        self
    }

    /// The browser this crawl drives.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Criteria of this crawl.
    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    /// Counters so far.
    pub fn stats(&self) -> CrawlStats {
        self.stats
    }

    /// Produce the next accepted record.
    ///
    /// Returns `None` once the cards are exhausted or login failed, and a
    /// single `Err` for a failure that ends the crawl. Either way every later
    /// call returns `None`.
    pub async fn next_record(&mut self) -> Option<Result<JobRecord>> {
        let span = self.span.clone();
        self.advance().instrument(span).await
    }

    /// Turn the pipeline into a stream of records.
    pub fn into_stream(self) -> impl Stream<Item = Result<JobRecord>> {
        stream::unfold(self, |mut pipeline| async move {
            let item = pipeline.next_record().await?;
            Some((item, pipeline))
        })
    }

    async fn advance(&mut self) -> Option<Result<JobRecord>> {
        loop {
            let step = match &mut self.phase {
                Phase::Finished => return None,
                Phase::Pending => Step::Start,
                Phase::Listing { cards, next } => match cards.get(*next) {
                    Some(card) => {
                        *next += 1;
                        Step::Card(card.clone())
                    }
                    None => Step::Exhausted,
                },
            };

            match step {
                Step::Start => match self.start().await {
                    Ok(Some(cards)) => {
                        self.stats.cards = cards.len();
                        self.phase = Phase::Listing { cards, next: 0 };
                    }
                    Ok(None) => {
                        self.phase = Phase::Finished;
                        return None;
                    }
                    Err(e) => return Some(Err(self.fail(e))),
                },
                Step::Card(card) => match self.process_card(&card).await {
                    Ok(Some(record)) => {
                        self.stats.accepted += 1;
                        return Some(Ok(record));
                    }
                    Ok(None) => self.stats.rejected += 1,
                    Err(e) if e.is_card_level() => {
                        self.stats.abandoned += 1;
                        tracing::warn!("Abandoning card {}: {}", card, e);
                    }
                    Err(e) => return Some(Err(self.fail(e))),
                },
                Step::Exhausted => {
                    tracing::info!(
                        "Crawl finished: {} cards, {} accepted, {} rejected, {} abandoned",
                        self.stats.cards,
                        self.stats.accepted,
                        self.stats.rejected,
                        self.stats.abandoned
                    );
                    self.phase = Phase::Finished;
                    return None;
                }
            }
        }
    }

    fn fail(&mut self, error: CrawlError) -> CrawlError {
        tracing::error!("Crawl failed: {}", error);
        self.phase = Phase::Finished;
        error
    }

    /// Log in, open the search and load every result card.
    async fn start(&mut self) -> Result<Option<Vec<Locator>>> {
        tracing::info!("Starting crawl");
        if !self.session.establish(&self.driver).await? {
            tracing::warn!("Could not authenticate, crawl yields nothing");
            return Ok(None);
        }

        let url = build_search_url(&self.base_url, &self.criteria);
        self.driver.navigate(&url).await?;
        self.navigator
            .apply_ui_facets(&self.driver, &self.criteria)
            .await;

        let outcome = self
            .navigator
            .paginate(&self.driver, self.criteria.scroll_count())
            .await?;
        let cards = self
            .driver
            .all(&Locator::css(RESULTS_CONTAINER).locate(CARD))
            .await?;

        tracing::info!(
            "Loaded {} cards after {} scroll(s) ({:?})",
            cards.len(),
            outcome.scrolls,
            outcome.stop
        );
        Ok(Some(cards))
    }

    async fn process_card(&self, card: &Locator) -> Result<Option<JobRecord>> {
        let filters = FilterChain::new(&self.criteria);

        let summary = self.extractor.summarize(&self.driver, card).await?;
        if let Verdict::Reject(reason) = filters.check_card(&summary) {
            tracing::debug!("Skipping {}: {}", card, reason);
            return Ok(None);
        }

        self.extractor.open_detail(&self.driver, card).await?;

        let activity = self.extractor.recruiter_activity(&self.driver).await?;
        if let Verdict::Reject(reason) = filters.check_activity(activity.as_deref()) {
            tracing::debug!("Skipping {} at {}: {}", summary.company, card, reason);
            return Ok(None);
        }

        let record = self
            .extractor
            .extract(&self.driver, &summary, &self.criteria)
            .await?;
        match filters.check_record(&record) {
            Verdict::Accept => {
                tracing::debug!("Accepted {}", record);
                Ok(Some(record))
            }
            Verdict::Reject(reason) => {
                tracing::debug!("Rejected {}: {}", record, reason);
                Ok(None)
            }
        }
    }
}

impl<D> std::fmt::Debug for CrawlPipeline<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlPipeline")
            .field("criteria", &self.criteria)
            .field("phase", &self.phase)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
