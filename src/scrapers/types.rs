use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// A search whose results are paginated
pub trait ListingFilter: Send + Sync {
    /// Stable name; partitions classification and storage.
    fn name(&self) -> &str;

    /// URL of results page `page_index` (1-based on the source).
    fn compose_page_url(&self, page_index: u32) -> Url;
}

/// Search parameters for one saved otodom query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFilter {
    pub name: String,
    /// Results URL without paging, e.g. `.../wyniki/sprzedaz/mieszkanie/mazowieckie/warszawa`
    pub base_url: Url,
    /// Minimum total price (PLN)
    #[serde(default)]
    pub price_min: Option<u64>,
    /// Maximum total price (PLN)
    #[serde(default)]
    pub price_max: Option<u64>,
    /// Minimum size in square meters
    #[serde(default)]
    pub area_min: Option<u32>,
    /// Maximum size in square meters
    #[serde(default)]
    pub area_max: Option<u32>,
    /// Results per page
    #[serde(default)]
    pub per_page: Option<u32>,
    /// Any other query parameters, passed through verbatim
    #[serde(default)]
    pub query: BTreeMap<String, String>,
}

impl SearchFilter {
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
            price_min: None,
            price_max: None,
            area_min: None,
            area_max: None,
            per_page: None,
            query: BTreeMap::new(),
        }
    }
}

impl ListingFilter for SearchFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn compose_page_url(&self, page_index: u32) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            let typed = [
                ("priceMin", self.price_min.map(|v| v.to_string())),
                ("priceMax", self.price_max.map(|v| v.to_string())),
                ("areaMin", self.area_min.map(|v| v.to_string())),
                ("areaMax", self.area_max.map(|v| v.to_string())),
                ("limit", self.per_page.map(|v| v.to_string())),
            ];
            for (key, value) in typed {
                if let Some(value) = value {
                    pairs.append_pair(key, &value);
                }
            }
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("page", &page_index.to_string());
        }
        url
    }
}
