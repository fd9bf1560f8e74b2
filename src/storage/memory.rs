use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::Listing;
use crate::storage::{
    classify_batch, upsert_into, Classified, ListingStore, SnapshotKind, StoredListing,
};

/// One recorded snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub kind: SnapshotKind,
    pub filter_name: String,
    pub taken_at: DateTime<Utc>,
    pub listings: Vec<Listing>,
}

#[derive(Debug, Default)]
struct State {
    listings: HashMap<String, HashMap<String, StoredListing>>,
    snapshots: Vec<Snapshot>,
}

/// Process-local store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshots taken so far, oldest first.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.state().snapshots.clone()
    }

    pub fn get(&self, filter_name: &str, id: &str) -> Option<StoredListing> {
        self.state()
            .listings
            .get(filter_name)
            .and_then(|partition| partition.get(id))
            .cloned()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn classify(&self, batch: &[Listing], filter_name: &str) -> Result<Classified> {
        let state = self.state();
        let partition = state.listings.get(filter_name);
        Ok(classify_batch(batch, |id| {
            partition.and_then(|p| p.get(id)).map(|stored| &stored.listing)
        }))
    }

    async fn persist_new(
        &self,
        batch: &[Listing],
        filter_name: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state();
        upsert_into(state.listings.entry(filter_name.to_string()).or_default(), batch, now);
        Ok(())
    }

    async fn persist_updated(
        &self,
        batch: &[Listing],
        filter_name: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.persist_new(batch, filter_name, now).await
    }

    async fn snapshot(
        &self,
        kind: SnapshotKind,
        batch: &[Listing],
        filter_name: &str,
        now: DateTime<Utc>,
    ) {
        self.state().snapshots.push(Snapshot {
            kind,
            filter_name: filter_name.to_string(),
            taken_at: now,
            listings: batch.to_vec(),
        });
    }

    async fn total_count(&self, filter_name: &str) -> Result<usize> {
        Ok(self
            .state()
            .listings
            .get(filter_name)
            .map_or(0, HashMap::len))
    }
}
