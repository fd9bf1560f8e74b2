//! Incremental otodom listing scout: walks search result pages, enriches
//! each offer from its detail page, and sorts what it finds into new and
//! updated listings against a persisted baseline.

pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod scrapers;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use error::{Result, ScoutError};
pub use ingest::{fetch_and_persist, IngestPlan, IngestReport};
pub use models::{Listing, NewListing};
