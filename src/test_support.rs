//! Canned otodom pages and a fetcher that serves them.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use url::Url;

use crate::error::Result;
use crate::scrapers::html::HtmlPage;
use crate::scrapers::otodom::DEFAULT_OFFER_BASE_URL;
use crate::scrapers::traits::{FetchedPage, PageFetcher};

/// Serves registered bodies by exact URL and 404 for everything else.
#[derive(Default)]
pub struct StubFetcher {
    pages: Mutex<HashMap<String, (u16, String)>>,
    requests: Mutex<Vec<(String, Instant)>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, status: u16, body: String) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body));
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.request_log().into_iter().map(|(url, _)| url).collect()
    }

    /// Every URL requested so far with the time it was requested.
    pub fn request_log(&self) -> Vec<(String, Instant)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn get(&self, url: &Url) -> Result<FetchedPage> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        let (status, body) = self
            .pages
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .unwrap_or((404, "not found".to_string()));
        Ok(FetchedPage {
            url: url.clone(),
            status: StatusCode::from_u16(status).unwrap(),
            body,
        })
    }
}

pub fn offer_url(slug: &str) -> String {
    format!("{DEFAULT_OFFER_BASE_URL}{slug}")
}

/// A results-slice entry with a public price.
pub fn search_item(id: u64, slug: &str) -> Value {
    json!({
        "id": id,
        "slug": slug,
        "title": format!("Mieszkanie {id}"),
        "areaInSquareMeters": 48.5,
        "hidePrice": false,
        "locationLabel": {"value": "Warszawa, Mokotów, mazowieckie"},
        "totalPrice": {"value": 650000, "currency": "PLN"},
        "dateCreated": "2024-03-01 10:00:00",
        "pushedUpAt": null
    })
}

fn with_data_block(data: &Value) -> String {
    format!(
        "<html><head><title>otodom</title></head><body><div id=\"__next\"></div>\
         <script id=\"__NEXT_DATA__\" type=\"application/json\">{data}</script></body></html>"
    )
}

pub fn results_html(organic: Vec<Value>, promoted: Vec<Value>) -> String {
    with_data_block(&json!({
        "props": {"pageProps": {"data": {
            "searchAds": {"items": organic},
            "searchAdsRandomPromoted": {"items": promoted}
        }}}
    }))
}

pub fn results_page(url: &str, organic: Vec<Value>, promoted: Vec<Value>) -> HtmlPage {
    HtmlPage::new(Url::parse(url).unwrap(), results_html(organic, promoted))
}

pub fn terminal_html() -> String {
    "<html><body><div data-cy=\"no-search-results\">Nie znaleźliśmy ogłoszeń</div>\
     <script id=\"__NEXT_DATA__\" type=\"application/json\">{\"props\":{\"pageProps\":{}}}</script>\
     </body></html>"
        .to_string()
}

pub fn offer_page(target: Value) -> String {
    with_data_block(&json!({"props": {"pageProps": {"ad": {"target": target}}}}))
}
