use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{Result, ScoutError};
use crate::models::Listing;
use crate::scrapers::dedup::unique_by;
use crate::scrapers::otodom::OtodomExtractor;
use crate::scrapers::traits::PageFetcher;
use crate::scrapers::types::ListingFilter;

/// No single fetch call visits more pages than this, whatever it is asked.
pub const PAGE_HARD_LIMIT: u32 = 100;

/// Which pages one fetch call covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageWindow {
    /// Pages after this index are fetched; the first request is `start_page + 1`.
    pub start_page: u32,
    /// Stop after this many pages.
    pub limit_pages: Option<u32>,
}

/// Walks the results pages of a filter, one page at a time.
///
/// Results pages wait on the extractor's rate limiter, so every request to
/// the source shares one budget.
pub struct PaginatedFetcher {
    fetcher: Arc<dyn PageFetcher>,
    extractor: OtodomExtractor,
}

impl PaginatedFetcher {
    pub fn new(fetcher: Arc<dyn PageFetcher>, extractor: OtodomExtractor) -> Self {
        Self { fetcher, extractor }
    }

    /// Fetches every page in `window` until the source reports no more
    /// results, returning listings deduplicated by url and then by id, first
    /// occurrence winning.
    ///
    /// Any failure aborts the whole call and drops what was gathered.
    pub async fn fetch(
        &self,
        filter: &dyn ListingFilter,
        observed_at: DateTime<Utc>,
        window: PageWindow,
    ) -> Result<Vec<Listing>> {
        let mut page_idx = window.start_page;
        let mut visited = 0u32;
        let mut listings = Vec::new();

        loop {
            if visited >= PAGE_HARD_LIMIT {
                warn!(
                    filter = filter.name(),
                    visited, "page hard limit reached, stopping"
                );
                break;
            }

            self.extractor.limiter().acquire().await;
            page_idx += 1;
            visited += 1;

            let url = filter.compose_page_url(page_idx);
            info!(filter = filter.name(), page = page_idx, %url, "querying results page");
            let page = self.fetcher.get(&url).await?.into_success()?;

            if self.extractor.is_terminal(&page) {
                debug!(filter = filter.name(), page = page_idx, "no more results");
                break;
            }

            let parsed = self.extractor.extract(&page, observed_at).await?;
            if parsed.is_empty() {
                return Err(ScoutError::InconsistentPage {
                    url: url.to_string(),
                    page: page_idx,
                });
            }
            listings.extend(parsed);

            if window.limit_pages.is_some_and(|limit| visited >= limit) {
                break;
            }
        }

        let listings = unique_by(listings, |listing| listing.url().to_string());
        Ok(unique_by(listings, |listing| listing.id().to_string()))
    }
}
