//! Browser boundary for the jobhound crawler.
//!
//! Everything the crawler does to a page goes through the [`BrowserActions`]
//! trait and lazily resolved [`Locator`]s. Two drivers implement it:
//!
//! - [`BrowserEngine`] drives a real Chromium over CDP, with a randomized
//!   fingerprint and per-domain navigation throttling.
//! - [`ReplayDriver`] answers from saved HTML, for offline runs and tests.
//!
//! [`Pacer`] adds the randomized pauses that keep interaction timing human.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod locator;
pub mod pacing;
pub mod replay;

pub use actions::{BrowserActions, BrowserCookie};
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
pub use locator::{Locator, Step};
pub use pacing::{Clock, Pacer, RecordingClock, TokioClock};
pub use replay::ReplayDriver;
