pub mod json_file;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Listing;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// A fetched batch split against what the store already knows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classified {
    pub new_listings: Vec<Listing>,
    pub updated_listings: Vec<Listing>,
}

/// Which stage of a cycle a snapshot records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Fetched,
    New,
    Updated,
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetched => "fetched",
            Self::New => "new",
            Self::Updated => "updated",
        })
    }
}

/// A listing as persisted, with bookkeeping times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredListing {
    pub listing: Listing,
    pub first_seen_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

/// Persisted listing state, partitioned by filter name.
///
/// Implementations own their synchronization; callers only ever hold a
/// shared reference.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Splits `batch` into listings the store has never seen and listings
    /// whose watched fields changed. Does not modify the store.
    async fn classify(&self, batch: &[Listing], filter_name: &str) -> Result<Classified>;

    /// Upserts listings seen for the first time.
    async fn persist_new(
        &self,
        batch: &[Listing],
        filter_name: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Upserts listings whose watched fields changed.
    async fn persist_updated(
        &self,
        batch: &[Listing],
        filter_name: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Appends an audit copy of `batch`. Best effort: failures are logged.
    async fn snapshot(
        &self,
        kind: SnapshotKind,
        batch: &[Listing],
        filter_name: &str,
        now: DateTime<Utc>,
    );

    /// Number of listings persisted for `filter_name`.
    async fn total_count(&self, filter_name: &str) -> Result<usize>;
}

/// Whether `fresh` differs from `stored` in a field the scout watches.
pub fn has_changed(stored: &Listing, fresh: &Listing) -> bool {
    stored.last_changed_at() != fresh.last_changed_at() || stored.price() != fresh.price()
}

/// Shared classification rule: unknown ids are new, known ids with a watched
/// change are updated, everything else is dropped.
pub fn classify_batch<'a, F>(batch: &[Listing], mut lookup: F) -> Classified
where
    F: FnMut(&str) -> Option<&'a Listing>,
{
    let mut classified = Classified::default();
    for listing in batch {
        match lookup(listing.id()) {
            None => classified.new_listings.push(listing.clone()),
            Some(stored) if has_changed(stored, listing) => {
                classified.updated_listings.push(listing.clone());
            }
            Some(_) => {}
        }
    }
    classified
}

/// Inserts or refreshes `batch` in one filter's partition.
pub(crate) fn upsert_into(
    partition: &mut std::collections::HashMap<String, StoredListing>,
    batch: &[Listing],
    now: DateTime<Utc>,
) {
    for listing in batch {
        partition
            .entry(listing.id().to_string())
            .and_modify(|stored| {
                stored.listing = listing.clone();
                stored.last_updated_at = now;
            })
            .or_insert_with(|| StoredListing {
                listing: listing.clone(),
                first_seen_at: now,
                last_updated_at: now,
            });
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};

    use crate::models::{Listing, NewListing};

    pub fn listing(id: &str, price: u64, promoted_day: Option<u32>) -> Listing {
        let cet = FixedOffset::east_opt(3600).unwrap();
        Listing::new(NewListing {
            id: id.to_string(),
            url: format!("https://www.otodom.pl/pl/oferta/x-{id}"),
            title: format!("Mieszkanie {id}"),
            area: Some(50.0),
            room_count: Some(2),
            has_garage: false,
            build_year: None,
            location_label: "Mokotów".to_string(),
            price: Some(price),
            created_at: Some(cet.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()),
            promoted_at: promoted_day
                .map(|day| cet.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap()),
            observed_at: now(),
        })
        .unwrap()
    }

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::listing;
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_classify_batch() {
        let known: HashMap<String, Listing> =
            [listing("A", 500_000, None), listing("B", 600_000, None)]
                .into_iter()
                .map(|l| (l.id().to_string(), l))
                .collect();

        let batch = vec![
            listing("A", 500_000, None),
            listing("B", 600_000, Some(5)),
            listing("C", 700_000, None),
        ];
        let classified = classify_batch(&batch, |id| known.get(id));

        let new: Vec<_> = classified.new_listings.iter().map(Listing::id).collect();
        let updated: Vec<_> = classified.updated_listings.iter().map(Listing::id).collect();
        assert_eq!(new, vec!["C"]);
        assert_eq!(updated, vec!["B"]);
    }

    #[test]
    fn test_price_change_counts() {
        assert!(has_changed(&listing("A", 500_000, None), &listing("A", 480_000, None)));
        assert!(!has_changed(&listing("A", 500_000, Some(4)), &listing("A", 500_000, Some(4))));
    }
}
