use crate::error::{Result, ScoutError};
use crate::scrapers::html::HtmlPage;
use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

/// A raw response as seen by the scrapers.
///
/// Non-success statuses are data here; deciding which ones are fatal is the
/// caller's job.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub status: StatusCode,
    pub body: String,
}

impl FetchedPage {
    /// The body as an HTML page, or a `Status` error for non-2xx responses.
    pub fn into_success(self) -> Result<HtmlPage> {
        if !self.status.is_success() {
            return Err(ScoutError::Status {
                url: self.url.to_string(),
                status: self.status,
            });
        }
        Ok(HtmlPage::new(self.url, self.body))
    }
}

/// Something that can GET a page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get(&self, url: &Url) -> Result<FetchedPage>;
}

/// Access to the structured parts of a fetched page.
///
/// The extractor only talks to pages through this, so a markup change on the
/// source side means a new implementation, not a new extraction algorithm.
pub trait PagePayload {
    /// Where the page came from, for error context.
    fn source_url(&self) -> &Url;

    /// The whole payload as received.
    fn raw(&self) -> &str;

    /// The embedded JSON data block, if the page carries one.
    fn locate_data_block(&self) -> Option<String>;

    /// Whether the page is the source's "no results for this query" page.
    fn shows_no_results(&self) -> bool;
}
