use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, ScoutError};
use crate::models::Listing;
use crate::storage::{
    classify_batch, upsert_into, Classified, ListingStore, SnapshotKind, StoredListing,
};

const INDEX_FILE: &str = "listings.json";
const SNAPSHOT_DIR: &str = "snapshots";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Index {
    #[serde(default)]
    filters: HashMap<String, HashMap<String, StoredListing>>,
}

/// Listings kept as JSON under a data directory.
///
/// `listings.json` holds the current state of every filter and is rewritten
/// whole after each persist. Snapshots are separate files under
/// `snapshots/<filter>/`.
#[derive(Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    index: Mutex<Index>,
}

impl JsonFileStore {
    /// Opens (or starts) the store in `data_dir`.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| ScoutError::io(&data_dir, e))?;

        let index_path = data_dir.join(INDEX_FILE);
        let index = match tokio::fs::read_to_string(&index_path).await {
            Ok(json) => serde_json::from_str(&json).map_err(|e| {
                ScoutError::Storage(format!("corrupt index {}: {e}", index_path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Index::default(),
            Err(e) => return Err(ScoutError::io(&index_path, e)),
        };

        let known: usize = index.filters.values().map(HashMap::len).sum();
        info!(path = %data_dir.display(), listings = known, "opened listing store");

        Ok(Self {
            data_dir,
            index: Mutex::new(index),
        })
    }

    /// The in-memory partition only changes once the new index is on disk.
    async fn upsert(&self, batch: &[Listing], filter_name: &str, now: DateTime<Utc>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut index = self.index.lock().await;
        let mut partition = index.filters.get(filter_name).cloned().unwrap_or_default();
        upsert_into(&mut partition, batch, now);

        let previous = index.filters.insert(filter_name.to_string(), partition);
        if let Err(e) = self.write_index(&index).await {
            match previous {
                Some(previous) => index.filters.insert(filter_name.to_string(), previous),
                None => index.filters.remove(filter_name),
            };
            return Err(e);
        }
        debug!(filter = filter_name, listings = batch.len(), "persisted listings");
        Ok(())
    }

    /// Writes to a temporary file first so a crash never leaves half an index.
    async fn write_index(&self, index: &Index) -> Result<()> {
        let json = serde_json::to_string_pretty(index)?;
        let path = self.data_dir.join(INDEX_FILE);
        let tmp = self.data_dir.join(format!("{INDEX_FILE}.tmp"));
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| ScoutError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| ScoutError::io(&path, e))
    }

    async fn write_snapshot(
        &self,
        kind: SnapshotKind,
        batch: &[Listing],
        filter_name: &str,
        now: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let dir = self.data_dir.join(SNAPSHOT_DIR).join(filter_name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ScoutError::io(&dir, e))?;

        let stamp = now.format("%Y%m%dT%H%M%S");
        let mut path = dir.join(format!("{stamp}-{kind}.json"));
        let mut seq = 1;
        while tokio::fs::try_exists(&path).await.unwrap_or(false) {
            seq += 1;
            path = dir.join(format!("{stamp}-{kind}-{seq}.json"));
        }

        let json = serde_json::to_string_pretty(batch)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| ScoutError::io(&path, e))?;
        Ok(path)
    }
}

#[async_trait]
impl ListingStore for JsonFileStore {
    async fn classify(&self, batch: &[Listing], filter_name: &str) -> Result<Classified> {
        let index = self.index.lock().await;
        let partition = index.filters.get(filter_name);
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
        self.upsert(batch, filter_name, now).await
    }

    async fn persist_updated(
        &self,
        batch: &[Listing],
        filter_name: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.upsert(batch, filter_name, now).await
    }

    async fn snapshot(
        &self,
        kind: SnapshotKind,
        batch: &[Listing],
        filter_name: &str,
        now: DateTime<Utc>,
    ) {
        match self.write_snapshot(kind, batch, filter_name, now).await {
            Ok(path) => {
                debug!(path = %path.display(), %kind, listings = batch.len(), "saved snapshot")
            }
            Err(e) => warn!(filter = filter_name, %kind, error = %e, "could not save snapshot"),
        }
    }

    async fn total_count(&self, filter_name: &str) -> Result<usize> {
        let index = self.index.lock().await;
        Ok(index.filters.get(filter_name).map_or(0, HashMap::len))
    }
}
