//! Jobhound Core - Foundation crate for the jobhound crawler.
//!
//! This crate provides shared types, error handling, configuration management,
//! and the static lookup tables that all other jobhound crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Search criteria, card summaries and validated job records
//! - [`facets`] - City and facet code tables
//! - [`obfuscation`] - Decoder for glyph-substituted salary digits
//!
//! # Example
//!
//! ```rust
//! use jobhound_core::{obfuscation, SearchCriteria};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let criteria = SearchCriteria::new("Python开发", "北京")?.with_salary("105");
//! assert_eq!(criteria.city_code(), "101010100");
//! assert_eq!(obfuscation::decode("\u{E032}\u{E031}K"), "10K");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod facets;
pub mod obfuscation;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, DelayRange, OutputConfig, OutputFormat, PacingConfig, SearchConfig,
    SessionConfig,
};
pub use error::{ConfigError, ConfigResult, JobhoundError, Result};
pub use facets::{FacetKind, UNKNOWN_CITY};
pub use types::{absolutize_url, JobDraft, JobRecord, ListingSummary, SearchCriteria};
