use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use flat_scout::config::{ScoutConfig, DEFAULT_CONFIG_FILE};
use flat_scout::scrapers::{
    HttpFetcher, ListingFilter, OtodomExtractor, PageFetcher, PaginatedFetcher, RateLimiter,
    SearchFilter,
};
use flat_scout::storage::JsonFileStore;
use flat_scout::{fetch_and_persist, IngestReport};

/// Fetch otodom search results and record new and changed listings.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(short, long, env = "FLAT_SCOUT_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Only run these filters (repeatable)
    #[arg(short, long = "filter", value_name = "NAME")]
    filters: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ScoutConfig::load(&cli.config)
        .await
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let filters = config.select_filters(&cli.filters)?;

    info!("🏠 flat-scout: {} filter(s)", filters.len());

    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(HttpFetcher::new(&config.http.user_agent, config.http.timeout())?);
    let extractor = OtodomExtractor::new(
        fetcher.clone(),
        RateLimiter::new(config.rate_limit.request_delay()),
        config.extractor_settings(),
    );
    let pager = PaginatedFetcher::new(fetcher, extractor);
    let store = JsonFileStore::open(&config.storage.data_dir).await?;

    let observed_at = Utc::now();
    let mut failed = Vec::new();
    for filter in filters {
        match run_filter(&config, &store, &pager, observed_at, filter).await {
            Ok(report) => print_report(&report),
            Err(e) => {
                error!(filter = filter.name(), kind = e.kind(), "giving up on filter: {e}");
                failed.push(filter.name().to_string());
            }
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("filters failed: {}", failed.join(", "));
    }
    Ok(())
}

/// Runs one filter, retrying the whole run up to `max_attempts` times.
async fn run_filter(
    config: &ScoutConfig,
    store: &JsonFileStore,
    pager: &PaginatedFetcher,
    observed_at: DateTime<Utc>,
    filter: &SearchFilter,
) -> flat_scout::Result<IngestReport> {
    let attempts = config.ingest.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        info!(filter = filter.name(), attempt, "starting ingestion");
        match fetch_and_persist(store, pager, observed_at, filter, config.ingest.plan()).await {
            Ok(report) => return Ok(report),
            Err(e) if attempt < attempts => {
                let backoff = config.ingest.retry_backoff();
                warn!(
                    filter = filter.name(),
                    attempt,
                    kind = e.kind(),
                    backoff_secs = backoff.as_secs(),
                    "ingestion failed, retrying: {e}"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn print_report(report: &IngestReport) {
    println!(
        "{}: {} new, {} updated, {} total",
        report.filter_name,
        report.new_count(),
        report.updated_count(),
        report.total_listings
    );
    for listing in report.new_listings.iter().flatten() {
        let price = listing
            .price()
            .map_or_else(|| "?".to_string(), |p| format!("{p} zł"));
        let area = listing
            .area()
            .map_or_else(|| "?".to_string(), |a| format!("{a} m²"));
        println!("  + {} ({price}, {area}) {}", listing.title(), listing.location_label());
        println!("    {}", listing.url());
    }
}
