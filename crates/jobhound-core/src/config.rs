//! Configuration management for jobhound.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main application configuration.
///
/// This is loaded from `~/.config/jobhound/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// What to search for
    pub search: SearchConfig,
    /// Login and credential settings
    pub session: SessionConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Human-like timing jitter
    pub pacing: PacingConfig,
    /// Where and how results are written
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::from_file(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file. The file must exist.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `JOBHOUND_HEADLESS`: Override browser headless mode (true/false)
    /// - `JOBHOUND_SCROLL_COUNT`: Override the number of pagination scrolls
    /// - `JOBHOUND_COOKIES_PATH`: Override where the session credential lives
    /// - `JOBHOUND_QUERY`: Override the search keyword
    /// - `JOBHOUND_CITY`: Override the search city (code or name)
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env();
        Ok(config)
    }

    /// Apply `JOBHOUND_*` environment overrides to an already loaded config.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("JOBHOUND_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("JOBHOUND_SCROLL_COUNT") {
            if let Ok(count) = val.parse() {
                self.search.scroll_count = count;
                tracing::debug!("Override search.scroll_count from env: {}", count);
            }
        }

        if let Ok(val) = std::env::var("JOBHOUND_COOKIES_PATH") {
            tracing::debug!("Override session.cookies_path from env: {}", val);
            self.session.cookies_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("JOBHOUND_QUERY") {
            tracing::debug!("Override search.query from env: {}", val);
            self.search.query = val;
        }

        if let Ok(val) = std::env::var("JOBHOUND_CITY") {
            tracing::debug!("Override search.city from env: {}", val);
            self.search.city = val;
        }
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.session.max_polls == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.max_polls".to_string(),
                reason: "at least one login poll is required".to_string(),
            });
        }
        self.pacing.validate()
    }

    /// Save configuration to `path`, creating its directory if needed.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/jobhound/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "jobhound", "jobhound").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/jobhound`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "jobhound", "jobhound").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// The search request handed to the crawler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search keyword, may contain several whitespace separated words
    pub query: String,
    /// City code (e.g. `101010100`) or a known city name
    pub city: String,
    /// Salary facet code
    pub salary: Option<String>,
    /// Experience facet code
    pub experience: Option<String>,
    /// Degree facet code
    pub degree: Option<String>,
    /// Number of infinite-scroll iterations
    pub scroll_count: u32,
    /// Card tag labels to skip (e.g. `急招`)
    pub tag_exclusions: Vec<String>,
    /// Companies never to emit
    pub company_blacklist: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query: String::new(),
            city: "100010000".to_string(),
            salary: None,
            experience: None,
            degree: None,
            scroll_count: 8,
            tag_exclusions: Vec::new(),
            company_blacklist: Vec::new(),
        }
    }
}

/// Login and credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where the cookie blob is read from and written to
    pub cookies_path: PathBuf,
    /// How many times the login marker is polled before giving up
    pub max_polls: u32,
    /// Bounded wait for the login marker on each poll
    pub poll_interval_ms: u64,
    /// Bounded wait for the QR code image after revealing it
    pub qr_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookies_path: AppConfig::data_dir()
                .map_or_else(|_| PathBuf::from("cookies.json"), |dir| dir.join("cookies.json")),
            max_polls: 300,
            poll_interval_ms: 1000,
            qr_timeout_ms: 5000,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode (implies unattended QR login)
    pub headless: bool,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Default bounded wait for an element to appear or disappear
    pub element_timeout_ms: u64,
    /// Minimum time between two navigations to the same domain
    pub min_navigation_interval_ms: u64,
    /// Origin of the recruiting site
    pub base_url: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            navigation_timeout_secs: 30,
            element_timeout_ms: 5000,
            min_navigation_interval_ms: 1000,
            base_url: "https://www.zhipin.com".to_string(),
        }
    }
}

/// Inclusive range of milliseconds a randomized pause is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound in milliseconds
    pub min_ms: u64,
    /// Upper bound in milliseconds
    pub max_ms: u64,
}

impl DelayRange {
    /// Create a new range.
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    fn validate(&self, field: &str) -> ConfigResult<()> {
        if self.max_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: format!("pacing.{field}"),
                reason: "max_ms must be positive, pacing cannot be disabled".to_string(),
            });
        }
        if self.min_ms > self.max_ms {
            return Err(ConfigError::InvalidValue {
                field: format!("pacing.{field}"),
                reason: format!("min_ms ({}) exceeds max_ms ({})", self.min_ms, self.max_ms),
            });
        }
        Ok(())
    }
}

/// Randomized delays around every interactive action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Delay between mouse down and mouse up
    pub click_delay: DelayRange,
    /// Pause before clicking a result card
    pub before_click: DelayRange,
    /// Pause after clicking a result card
    pub after_click: DelayRange,
    /// Reading time spent on every opened detail view
    pub detail_dwell: DelayRange,
    /// Pause after a random pointer move
    pub pointer_settle: DelayRange,
    /// Pause after the results list first appears
    pub results_dwell: DelayRange,
    /// Pause after each pagination scroll
    pub scroll_dwell: DelayRange,
    /// Pause after the loading indicator disappears
    pub after_load: DelayRange,
    /// Pause for the results to refresh after a facet click
    pub facet_refresh: DelayRange,
    /// Pause spent looking at refined results
    pub facet_dwell: DelayRange,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            click_delay: DelayRange::new(32, 512),
            before_click: DelayRange::new(300, 800),
            after_click: DelayRange::new(500, 1000),
            detail_dwell: DelayRange::new(2000, 5000),
            pointer_settle: DelayRange::new(200, 500),
            results_dwell: DelayRange::new(1000, 2000),
            scroll_dwell: DelayRange::new(1500, 3000),
            after_load: DelayRange::new(500, 1000),
            facet_refresh: DelayRange::new(300, 300),
            facet_dwell: DelayRange::new(800, 1500),
        }
    }
}

impl PacingConfig {
    /// Every range must be well formed and non-zero.
    pub fn validate(&self) -> ConfigResult<()> {
        self.click_delay.validate("click_delay")?;
        self.before_click.validate("before_click")?;
        self.after_click.validate("after_click")?;
        self.detail_dwell.validate("detail_dwell")?;
        self.pointer_settle.validate("pointer_settle")?;
        self.results_dwell.validate("results_dwell")?;
        self.scroll_dwell.validate("scroll_dwell")?;
        self.after_load.validate("after_load")?;
        self.facet_refresh.validate("facet_refresh")?;
        self.facet_dwell.validate("facet_dwell")
    }
}

/// Supported result file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty printed JSON array
    #[default]
    Json,
    /// Spreadsheet friendly CSV
    Csv,
    /// Human readable text blocks
    Txt,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "txt" => Ok(Self::Txt),
            other => Err(ConfigError::InvalidValue {
                field: "output.format".to_string(),
                reason: format!("unsupported format '{other}', expected json, csv or txt"),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Txt => "txt",
        };
        f.write_str(name)
    }
}

/// Result file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Destination file
    pub path: PathBuf,
    /// File format
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("jobs_data.json"),
            format: OutputFormat::Json,
        }
    }
}
