use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use super::traits::PagePayload;

static DATA_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script#__NEXT_DATA__").expect("valid selector"));
static NO_RESULTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-cy="no-search-results"]"#).expect("valid selector"));

/// An HTML page from a Next.js-rendered site.
///
/// Only the raw text is kept; the DOM is parsed on demand so the page stays
/// `Send` and can be held across awaits.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    url: Url,
    html: String,
}

impl HtmlPage {
    pub fn new(url: Url, html: String) -> Self {
        Self { url, html }
    }
}

impl PagePayload for HtmlPage {
    fn source_url(&self) -> &Url {
        &self.url
    }

    fn raw(&self) -> &str {
        &self.html
    }

    fn locate_data_block(&self) -> Option<String> {
        let document = Html::parse_document(&self.html);
        let text = document
            .select(&DATA_BLOCK)
            .next()?
            .text()
            .collect::<String>();
        (!text.trim().is_empty()).then_some(text)
    }

    fn shows_no_results(&self) -> bool {
        Html::parse_document(&self.html)
            .select(&NO_RESULTS)
            .next()
            .is_some()
    }
}
