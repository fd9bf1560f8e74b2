pub mod timestamps;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScoutError;

pub use timestamps::{parse_source_timestamp, to_naive_utc};

/// Unvalidated listing fields, as gathered by the extractor or read from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListing {
    pub id: String,
    pub url: String,
    pub title: String,
    pub area: Option<f64>,
    pub room_count: Option<u32>,
    pub has_garage: bool,
    pub build_year: Option<i32>,
    pub location_label: String,
    pub price: Option<u64>,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub promoted_at: Option<DateTime<FixedOffset>>,
    pub observed_at: DateTime<Utc>,
}

/// One observed offer at one point in time.
///
/// Only constructible through [`Listing::new`], which guarantees a non-empty
/// `id` and `url`. Values are never changed after construction; a newer
/// observation is a new `Listing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NewListing", into = "NewListing")]
pub struct Listing {
    id: String,
    url: String,
    title: String,
    area: Option<f64>,
    room_count: Option<u32>,
    has_garage: bool,
    build_year: Option<i32>,
    location_label: String,
    price: Option<u64>,
    created_at: Option<DateTime<FixedOffset>>,
    promoted_at: Option<DateTime<FixedOffset>>,
    observed_at: DateTime<Utc>,
}

impl Listing {
    pub fn new(fields: NewListing) -> Result<Self, ScoutError> {
        if fields.url.trim().is_empty() {
            return Err(ScoutError::validation("listing url is empty"));
        }
        if fields.id.trim().is_empty() {
            return Err(ScoutError::validation(format!(
                "listing id is empty for {}",
                fields.url
            )));
        }
        let NewListing {
            id,
            url,
            title,
            area,
            room_count,
            has_garage,
            build_year,
            location_label,
            price,
            created_at,
            promoted_at,
            observed_at,
        } = fields;
        Ok(Self {
            id,
            url,
            title,
            area,
            room_count,
            has_garage,
            build_year,
            location_label,
            price,
            created_at,
            promoted_at,
            observed_at,
        })
    }

    /// When the offer last changed at the source, in naive UTC.
    ///
    /// A "pushed to top" time wins over the creation time.
    pub fn last_changed_at(&self) -> Option<NaiveDateTime> {
        self.promoted_at
            .as_ref()
            .or(self.created_at.as_ref())
            .map(to_naive_utc)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn area(&self) -> Option<f64> {
        self.area
    }

    pub fn room_count(&self) -> Option<u32> {
        self.room_count
    }

    pub fn has_garage(&self) -> bool {
        self.has_garage
    }

    pub fn build_year(&self) -> Option<i32> {
        self.build_year
    }

    pub fn location_label(&self) -> &str {
        &self.location_label
    }

    pub fn price(&self) -> Option<u64> {
        self.price
    }

    pub fn created_at(&self) -> Option<&DateTime<FixedOffset>> {
        self.created_at.as_ref()
    }

    pub fn promoted_at(&self) -> Option<&DateTime<FixedOffset>> {
        self.promoted_at.as_ref()
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

impl TryFrom<NewListing> for Listing {
    type Error = ScoutError;

    fn try_from(fields: NewListing) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<Listing> for NewListing {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            url: listing.url,
            title: listing.title,
            area: listing.area,
            room_count: listing.room_count,
            has_garage: listing.has_garage,
            build_year: listing.build_year,
            location_label: listing.location_label,
            price: listing.price,
            created_at: listing.created_at,
            promoted_at: listing.promoted_at,
            observed_at: listing.observed_at,
        }
    }
}

/// Offer id carried by a canonical offer URL: the text after the last `-` of
/// the last path segment (`.../oferta/ladne-2-pokoje-ID4pXk1` -> `ID4pXk1`).
pub fn listing_id_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    let id = segment.rsplit('-').next()?.trim();
    (!id.is_empty()).then(|| id.to_string())
}
