//! Repeated fetch, classify, persist cycles for one filter.

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::error::Result;
use crate::models::Listing;
use crate::scrapers::pagination::{PageWindow, PaginatedFetcher};
use crate::scrapers::types::ListingFilter;
use crate::storage::{ListingStore, SnapshotKind};

/// Page budget of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestPlan {
    /// Window start of the first cycle.
    pub start_page: u32,
    /// Pages fetched per cycle; the window advances by this much.
    pub limit_pages_per_call: u32,
    /// No cycle starts at or past this page index, so with the defaults the
    /// run covers pages 1 to 5 and never requests page `last_page + 1`.
    pub last_page: u32,
}

impl Default for IngestPlan {
    fn default() -> Self {
        Self {
            start_page: 0,
            limit_pages_per_call: 1,
            last_page: 5,
        }
    }
}

/// What one run found. Batches keep their per-cycle grouping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub filter_name: String,
    pub new_listings: Vec<Vec<Listing>>,
    pub updated_listings: Vec<Vec<Listing>>,
    /// Listings stored for the filter after the run.
    pub total_listings: usize,
}

impl IngestReport {
    pub fn new_count(&self) -> usize {
        self.new_listings.iter().map(Vec::len).sum()
    }

    pub fn updated_count(&self) -> usize {
        self.updated_listings.iter().map(Vec::len).sum()
    }
}

/// Fetches `filter` window by window, classifying and persisting each batch.
///
/// Stops at the first empty batch or once the window reaches
/// `plan.last_page`. A failing cycle ends the run; nothing is retried here.
pub async fn fetch_and_persist(
    store: &dyn ListingStore,
    pager: &PaginatedFetcher,
    observed_at: DateTime<Utc>,
    filter: &dyn ListingFilter,
    plan: IngestPlan,
) -> Result<IngestReport> {
    let filter_name = filter.name();
    let step = plan.limit_pages_per_call.max(1);
    let mut report = IngestReport {
        filter_name: filter_name.to_string(),
        ..IngestReport::default()
    };

    let mut start_page = plan.start_page;
    loop {
        let window = PageWindow {
            start_page,
            limit_pages: Some(step),
        };
        let cycle = match run_cycle(store, pager, observed_at, filter, window).await {
            Ok(cycle) => cycle,
            Err(e) => {
                error!(
                    filter = filter_name,
                    start_page,
                    kind = e.kind(),
                    error = %e,
                    "ingestion cycle failed"
                );
                return Err(e);
            }
        };
        let Some((new_listings, updated_listings)) = cycle else {
            break;
        };

        report.new_listings.push(new_listings);
        report.updated_listings.push(updated_listings);

        start_page += step;
        if start_page >= plan.last_page {
            break;
        }
    }

    report.total_listings = store.total_count(filter_name).await?;
    info!(
        filter = filter_name,
        new = report.new_count(),
        updated = report.updated_count(),
        total = report.total_listings,
        "ingestion finished"
    );
    Ok(report)
}

/// One cycle; `None` when the window had no listings.
async fn run_cycle(
    store: &dyn ListingStore,
    pager: &PaginatedFetcher,
    observed_at: DateTime<Utc>,
    filter: &dyn ListingFilter,
    window: PageWindow,
) -> Result<Option<(Vec<Listing>, Vec<Listing>)>> {
    let filter_name = filter.name();
    let batch = pager.fetch(filter, observed_at, window).await?;
    if batch.is_empty() {
        return Ok(None);
    }

    store
        .snapshot(SnapshotKind::Fetched, &batch, filter_name, observed_at)
        .await;
    info!(
        filter = filter_name,
        start_page = window.start_page,
        fetched = batch.len(),
        "fetched listings"
    );

    let classified = store.classify(&batch, filter_name).await?;
    info!(
        filter = filter_name,
        new = classified.new_listings.len(),
        updated = classified.updated_listings.len(),
        "classified listings"
    );

    store
        .snapshot(SnapshotKind::New, &classified.new_listings, filter_name, observed_at)
        .await;
    store
        .snapshot(SnapshotKind::Updated, &classified.updated_listings, filter_name, observed_at)
        .await;

    store
        .persist_new(&classified.new_listings, filter_name, observed_at)
        .await?;
    store
        .persist_updated(&classified.updated_listings, filter_name, observed_at)
        .await?;

    Ok(Some((classified.new_listings, classified.updated_listings)))
}
