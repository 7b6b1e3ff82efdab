//! Jobhound CLI
//!
//! Crawls job listings for one search and writes the matches to a file.

mod output;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use futures::StreamExt;
use jobhound_browser::BrowserEngine;
use jobhound_core::{AppConfig, JobRecord, OutputFormat, SearchCriteria};
use jobhound_crawler::{CrawlError, CrawlPipeline};
use jobhound_session::LogQrSink;
use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;

/// Jobhound - job listing crawler
#[derive(Parser, Debug)]
#[command(name = "jobhound", version, about = "Crawl and filter job listings")]
struct Cli {
    /// Configuration file (default: platform config directory)
    #[arg(long, env = "JOBHOUND_CONFIG")]
    config: Option<PathBuf>,

    /// Search keyword(s), every word must appear in a kept listing
    #[arg(long)]
    query: Option<String>,

    /// City code or name, e.g. 101010100 or 北京
    #[arg(long)]
    city: Option<String>,

    /// Number of infinite-scroll iterations
    #[arg(long)]
    scrolls: Option<u32>,

    /// Session cookie file
    #[arg(long)]
    cookies: Option<PathBuf>,

    /// Run the browser headless and log the login QR code
    #[arg(long)]
    headless: bool,

    /// Result file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Result format: json, csv or txt
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// More logging (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    save_config: bool,
}

/// Initialize tracing. `RUST_LOG` takes precedence over the flags.
fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "info,jobhound=debug",
        (false, _) => "info,jobhound=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Load the config file, then apply environment and command line overrides.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = AppConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            config.apply_env();
            config
        }
        None => AppConfig::load_with_env().context("failed to load config")?,
    };

    if let Some(query) = &cli.query {
        config.search.query.clone_from(query);
    }
    if let Some(city) = &cli.city {
        config.search.city.clone_from(city);
    }
    if let Some(scrolls) = cli.scrolls {
        config.search.scroll_count = scrolls;
    }
    if let Some(cookies) = &cli.cookies {
        config.session.cookies_path.clone_from(cookies);
    }
    if cli.headless {
        config.browser.headless = true;
    }
    if let Some(path) = &cli.output {
        config.output.path.clone_from(path);
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Write `config` to the `--config` file, or the platform config file without one.
fn save_config(cli: &Cli, config: &AppConfig) -> Result<PathBuf> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::config_path().context("no config directory")?,
    };
    config
        .save_to(&path)
        .with_context(|| format!("failed to save config to {}", path.display()))?;
    Ok(path)
}

/// Run one crawl, collecting records until the stream ends.
///
/// A terminal crawl error is returned next to whatever was collected before it.
async fn crawl(
    config: &AppConfig,
    criteria: SearchCriteria,
) -> Result<(Vec<JobRecord>, Option<CrawlError>)> {
    let engine = BrowserEngine::new(&config.browser)
        .await
        .context("failed to launch browser")?;

    let mut pipeline = CrawlPipeline::new(engine, criteria, config);
    if config.browser.headless {
        pipeline = pipeline.with_qr_sink(Arc::new(LogQrSink));
    }

    let mut stream = pin!(pipeline.into_stream());
    let mut records = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(record) => {
                tracing::info!("[{}] {}", records.len() + 1, record);
                records.push(record);
            }
            Err(e) => return Ok((records, Some(e))),
        }
    }
    Ok((records, None))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = load_config(&cli)?;
    if cli.save_config {
        let path = save_config(&cli, &config)?;
        println!("Saved configuration to {}", path.display());
        return Ok(());
    }

    let criteria = SearchCriteria::try_from(&config.search).context("invalid search settings")?;
    tracing::info!(
        "Searching '{}' in {} ({})",
        criteria.query(),
        criteria.city_label(),
        criteria.city_code()
    );

    let (records, failure) = crawl(&config, criteria).await?;

    if records.is_empty() {
        println!("No records matched, nothing written");
    } else {
        let output = &config.output;
        output::write_records(&records, &output.path, output.format)
            .with_context(|| format!("failed to write {}", output.path.display()))?;
        println!(
            "Saved {} records to {} ({})",
            records.len(),
            output.path.display(),
            output.format
        );
    }

    match failure {
        Some(e) => Err(e).context("crawl ended early"),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[search]\nquery = \"Go\"\ncity = \"上海\"\nscroll_count = 2\n\n[output]\nformat = \"csv\"\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "jobhound",
            "--config",
            path.to_str().unwrap(),
            "--query",
            "Rust",
            "-f",
            "txt",
            "-o",
            "out/jobs.txt",
        ]);
        let config = load_config(&cli).unwrap();

        assert_eq!(config.search.query, "Rust");
        assert_eq!(config.search.city, "上海");
        assert_eq!(config.search.scroll_count, 2);
        assert_eq!(config.output.format, OutputFormat::Txt);
        assert_eq!(config.output.path, PathBuf::from("out/jobs.txt"));
    }

    #[test]
    fn test_save_config_writes_effective_settings() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[search]\nquery = \"Go\"\n").unwrap();

        let cli = Cli::parse_from([
            "jobhound",
            "--config",
            path.to_str().unwrap(),
            "--save-config",
            "--city",
            "上海",
            "--scrolls",
            "4",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(save_config(&cli, &config).unwrap(), path);

        let saved = AppConfig::from_file(&path).unwrap();
        assert_eq!(saved.search.query, "Go");
        assert_eq!(saved.search.city, "上海");
        assert_eq!(saved.search.scroll_count, 4);
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["jobhound", "-v", "-q"]).is_err());
        assert!(Cli::try_parse_from(["jobhound", "-f", "xml"]).is_err());
    }
}
