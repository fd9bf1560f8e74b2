pub mod dedup;
pub mod html;
pub mod http;
pub mod otodom;
pub mod pagination;
pub mod payload;
pub mod rate_limit;
pub mod traits;
pub mod types;

pub use html::HtmlPage;
pub use http::HttpFetcher;
pub use otodom::{ExtractorSettings, OtodomExtractor};
pub use pagination::{PageWindow, PaginatedFetcher, PAGE_HARD_LIMIT};
pub use rate_limit::RateLimiter;
pub use traits::{FetchedPage, PageFetcher, PagePayload};
pub use types::{ListingFilter, SearchFilter};
