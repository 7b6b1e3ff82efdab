//! Jobhound Crawler - search, extraction and filtering over one browsing session.
//!
//! [`CrawlPipeline`] ties the pieces together into a lazy stream of
//! [`JobRecord`](jobhound_core::JobRecord)s:
//!
//! 1. [`SessionManager`](jobhound_session::SessionManager) logs in
//! 2. [`build_search_url`] encodes the criteria and the results page is opened
//! 3. [`SearchNavigator`] applies on-page facets and paginates
//! 4. [`ListingExtractor`] reads every card and its detail view
//! 5. [`FilterChain`] drops anything that does not match the criteria
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use jobhound_browser::BrowserEngine;
//! use jobhound_core::{AppConfig, SearchCriteria};
//! use jobhound_crawler::CrawlPipeline;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let engine = BrowserEngine::new(&config.browser).await?;
//! let criteria = SearchCriteria::new("Rust", "上海")?.with_scroll_count(3);
//!
//! let mut records = Box::pin(CrawlPipeline::new(engine, criteria, &config).into_stream());
//! while let Some(record) = records.next().await {
//!     println!("{}", record?);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod extractor;
pub mod filter;
pub mod navigator;
pub mod pipeline;
pub mod url_builder;

pub use error::{CrawlError, Result};
pub use extractor::{resolve_city, resolve_experience, CityEvidence, ListingExtractor};
pub use filter::{FilterChain, Rejection, Verdict};
pub use navigator::{PaginationOutcome, PaginationStop, SearchNavigator};
pub use pipeline::{CrawlPipeline, CrawlStats};
pub use url_builder::build_search_url;
