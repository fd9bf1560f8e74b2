use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use reqwest::StatusCode;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Result, ScoutError};
use crate::models::{listing_id_from_url, parse_source_timestamp, Listing, NewListing};
use crate::scrapers::dedup::unique_by;
use crate::scrapers::payload::{
    NextData, OfferDetails, OfferPageProps, SearchItem, SearchPageProps,
};
use crate::scrapers::rate_limit::RateLimiter;
use crate::scrapers::traits::{PageFetcher, PagePayload};

pub const DEFAULT_OFFER_BASE_URL: &str = "https://www.otodom.pl/pl/oferta/";

/// Statuses on an offer page that mean "try this one another day".
fn is_transient_gateway(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Source-specific settings for turning otodom pages into listings.
#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    /// Offer URLs are `{offer_base_url}{slug}`; must end with `/`.
    pub offer_base_url: Url,
    /// Offset for naive timestamps in the payload.
    pub source_offset: FixedOffset,
    /// Where to keep raw offer pages that could not be read.
    pub diagnostics_dir: Option<PathBuf>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            offer_base_url: Url::parse(DEFAULT_OFFER_BASE_URL).expect("valid default offer url"),
            source_offset: FixedOffset::east_opt(3600).expect("valid offset"),
            diagnostics_dir: None,
        }
    }
}

/// Turns one otodom results page into enriched listings.
pub struct OtodomExtractor {
    fetcher: Arc<dyn PageFetcher>,
    limiter: RateLimiter,
    settings: ExtractorSettings,
}

impl OtodomExtractor {
    /// `limiter` paces offer pages and, through [`PaginatedFetcher`], results
    /// pages as well.
    ///
    /// [`PaginatedFetcher`]: crate::scrapers::PaginatedFetcher
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        limiter: RateLimiter,
        settings: ExtractorSettings,
    ) -> Self {
        Self {
            fetcher,
            limiter,
            settings,
        }
    }

    pub(crate) fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Whether the page is the "no results" page that ends pagination.
    pub fn is_terminal(&self, page: &impl PagePayload) -> bool {
        page.shows_no_results()
    }

    /// Parses a results page and enriches every public-price offer with its
    /// detail page.
    ///
    /// Organic and promoted results are merged, first occurrence of a source
    /// id wins, and offers whose URLs end in the same listing id are fetched
    /// once. A detail page that is temporarily unavailable or unreadable drops
    /// only that offer.
    pub async fn extract(
        &self,
        page: &impl PagePayload,
        observed_at: DateTime<Utc>,
    ) -> Result<Vec<Listing>> {
        let items = self.search_items(page)?;
        debug!(url = %page.source_url(), items = items.len(), "parsed results page");

        let mut listings = Vec::with_capacity(items.len());
        let mut seen_ids = HashSet::new();
        for item in items {
            if item.hide_price {
                debug!(source_id = item.id, "skipping offer with hidden price");
                continue;
            }

            if item.slug.trim().is_empty() {
                return Err(ScoutError::validation(format!("offer {} has no slug", item.id)));
            }
            let offer_url = self
                .settings
                .offer_base_url
                .join(&item.slug)
                .map_err(|e| {
                    ScoutError::validation(format!("bad offer slug {:?}: {e}", item.slug))
                })?;

            let listing_id = listing_id_from_url(offer_url.as_str()).unwrap_or_default();
            if !seen_ids.insert(listing_id) {
                debug!(url = %offer_url, "listing id already extracted from this page");
                continue;
            }

            let Some(details) = self.fetch_details(&offer_url).await? else {
                continue;
            };

            listings.push(self.build_listing(item, &offer_url, details, observed_at)?);
        }

        info!(url = %page.source_url(), listings = listings.len(), "extracted listings");
        Ok(listings)
    }

    fn search_items(&self, page: &impl PagePayload) -> Result<Vec<SearchItem>> {
        let url = page.source_url().as_str();
        let block = page
            .locate_data_block()
            .ok_or_else(|| ScoutError::malformed_page(url, "no __NEXT_DATA__ block"))?;
        let payload: NextData<SearchPageProps> = serde_json::from_str(&block).map_err(|e| {
            ScoutError::malformed_page(url, format!("undecodable data block: {e}"))
        })?;

        let data = payload.props.page_props.data;
        Ok(unique_by(
            data.search_ads
                .items
                .into_iter()
                .chain(data.search_ads_random_promoted.items),
            |item| item.id,
        ))
    }

    /// `Ok(None)` means "skip this offer".
    async fn fetch_details(&self, offer_url: &Url) -> Result<Option<OfferDetails>> {
        self.limiter.acquire().await;
        debug!(url = %offer_url, "querying offer page");

        let response = self.fetcher.get(offer_url).await?;
        if is_transient_gateway(response.status) {
            warn!(url = %offer_url, status = %response.status, "offer page unavailable, skipping");
            return Ok(None);
        }
        let page = response.into_success()?;

        let Some(block) = page.locate_data_block() else {
            self.report_malformed_offer(offer_url, page.raw(), "no __NEXT_DATA__ block")
                .await;
            return Ok(None);
        };

        let ad = serde_json::from_str::<NextData<OfferPageProps>>(&block)
            .map(|payload| payload.props.page_props.ad);
        match ad {
            Ok(Some(ad)) => Ok(Some(OfferDetails::from_target(&ad.target))),
            Ok(None) => {
                self.report_malformed_offer(offer_url, &block, "data block has no ad")
                    .await;
                Ok(None)
            }
            Err(e) => {
                let reason = format!("undecodable data block: {e}");
                self.report_malformed_offer(offer_url, &block, &reason).await;
                Ok(None)
            }
        }
    }

    fn build_listing(
        &self,
        item: SearchItem,
        offer_url: &Url,
        details: OfferDetails,
        observed_at: DateTime<Utc>,
    ) -> Result<Listing> {
        let url = offer_url.to_string();
        let id = listing_id_from_url(&url).unwrap_or_default();
        let offset = self.settings.source_offset;

        let location_label = item
            .location_label
            .and_then(|label| label.value)
            .map(|value| district_of(&value))
            .unwrap_or_default();

        let created_at = item.date_created.as_deref().and_then(|raw| {
            let parsed = parse_source_timestamp(raw, offset);
            if parsed.is_none() {
                debug!(%url, raw, "unparseable creation time");
            }
            parsed
        });
        let promoted_at = item
            .pushed_up_at
            .as_deref()
            .and_then(|raw| parse_source_timestamp(raw, offset));

        Listing::new(NewListing {
            id,
            url,
            title: item.title.unwrap_or_default(),
            area: item.area_in_square_meters,
            room_count: details.room_count,
            has_garage: details.has_garage,
            build_year: details.build_year,
            location_label,
            price: item
                .total_price
                .and_then(|price| price.value)
                .filter(|value| value.is_finite() && *value >= 0.0)
                .map(|value| value.round() as u64),
            created_at,
            promoted_at,
            observed_at,
        })
    }

    /// Logs an unreadable offer page and, when configured, keeps its raw
    /// payload on disk for later inspection. Never fails.
    async fn report_malformed_offer(&self, offer_url: &Url, raw: &str, reason: &str) {
        let preview: String = raw.chars().take(200).collect();
        warn!(
            url = %offer_url,
            reason,
            bytes = raw.len(),
            preview = %preview,
            "unreadable offer page, skipping"
        );

        let Some(dir) = &self.settings.diagnostics_dir else {
            return;
        };
        let name =
            listing_id_from_url(offer_url.as_str()).unwrap_or_else(|| "offer".to_string());
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let path = dir.join(format!("{name}-{stamp}.txt"));
        let written = match tokio::fs::create_dir_all(dir).await {
            Ok(()) => tokio::fs::write(&path, raw).await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => info!(path = %path.display(), "saved unreadable offer payload"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not save offer payload"),
        }
    }
}

/// `"Warszawa, Mokotów, mazowieckie"` -> `"Mokotów"`; a label without a
/// second part is kept whole.
fn district_of(label: &str) -> String {
    label
        .split(", ")
        .nth(1)
        .unwrap_or(label)
        .trim()
        .to_string()
}
