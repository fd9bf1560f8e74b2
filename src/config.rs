//! `flat-scout.toml` loading and validation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, ScoutError};
use crate::ingest::IngestPlan;
use crate::scrapers::http::DEFAULT_USER_AGENT;
use crate::scrapers::otodom::{ExtractorSettings, DEFAULT_OFFER_BASE_URL};
use crate::scrapers::types::SearchFilter;

pub const DEFAULT_CONFIG_FILE: &str = "flat-scout.toml";

/// Top-level config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub filters: Vec<SearchFilter>,
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[rate_limit]` section. Minimum gap between any two requests to the
/// source, results and offer pages alike, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_delay_ms")]
    pub request_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_delay_ms(),
        }
    }
}

impl RateLimitConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_offer_base_url")]
    pub offer_base_url: Url,
    /// Offset of naive source timestamps from UTC.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            offer_base_url: default_offer_base_url(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub start_page: u32,
    #[serde(default = "default_limit_pages_per_call")]
    pub limit_pages_per_call: u32,
    #[serde(default = "default_last_page")]
    pub last_page: u32,
    /// Runs of one filter before giving up on it.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            start_page: 0,
            limit_pages_per_call: default_limit_pages_per_call(),
            last_page: default_last_page(),
            max_attempts: default_max_attempts(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

impl IngestConfig {
    pub fn plan(&self) -> IngestPlan {
        IngestPlan {
            start_page: self.start_page,
            limit_pages_per_call: self.limit_pages_per_call,
            last_page: self.last_page,
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub diagnostics_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            diagnostics_dir: None,
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_delay_ms() -> u64 {
    3000
}
fn default_offer_base_url() -> Url {
    Url::parse(DEFAULT_OFFER_BASE_URL).expect("valid default offer url")
}
fn default_utc_offset_minutes() -> i32 {
    60
}
fn default_limit_pages_per_call() -> u32 {
    1
}
fn default_last_page() -> u32 {
    5
}
fn default_max_attempts() -> u32 {
    1
}
fn default_retry_backoff_secs() -> u64 {
    60
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl ScoutConfig {
    /// Reads and validates a config file.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ScoutError::io(path, e))?;
        Self::parse(&text).map_err(|e| match e {
            ScoutError::Config { message } => {
                ScoutError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ScoutError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.filters.is_empty() {
            return Err(ScoutError::config("at least one [[filters]] entry is required"));
        }
        let mut names = HashSet::new();
        for filter in &self.filters {
            let valid_name = !filter.name.is_empty()
                && filter
                    .name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid_name {
                return Err(ScoutError::config(format!(
                    "filter name {:?} must be non-empty ASCII letters, digits, '-' or '_'",
                    filter.name
                )));
            }
            if !names.insert(filter.name.as_str()) {
                return Err(ScoutError::config(format!("duplicate filter name {:?}", filter.name)));
            }
        }
        if self.ingest.limit_pages_per_call == 0 {
            return Err(ScoutError::config("ingest.limit_pages_per_call must be at least 1"));
        }
        if self.ingest.max_attempts == 0 {
            return Err(ScoutError::config("ingest.max_attempts must be at least 1"));
        }
        if !self.source.offer_base_url.path().ends_with('/') {
            return Err(ScoutError::config("source.offer_base_url must end with '/'"));
        }
        if self.source_offset().is_none() {
            return Err(ScoutError::config("source.utc_offset_minutes is out of range"));
        }
        Ok(())
    }

    fn source_offset(&self) -> Option<FixedOffset> {
        self.source
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }

    pub fn extractor_settings(&self) -> ExtractorSettings {
        ExtractorSettings {
            offer_base_url: self.source.offer_base_url.clone(),
            source_offset: self.source_offset().unwrap_or_else(|| {
                FixedOffset::east_opt(default_utc_offset_minutes() * 60).expect("valid offset")
            }),
            diagnostics_dir: self.storage.diagnostics_dir.clone(),
        }
    }

    /// The configured filters, or only those named in `names` when given.
    pub fn select_filters(&self, names: &[String]) -> Result<Vec<&SearchFilter>> {
        if names.is_empty() {
            return Ok(self.filters.iter().collect());
        }
        names
            .iter()
            .map(|name| {
                self.filters
                    .iter()
                    .find(|f| &f.name == name)
                    .ok_or_else(|| ScoutError::config(format!("no filter named {name:?}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[filters]]
        name = "warsaw-two-rooms"
        base_url = "https://www.otodom.pl/pl/wyniki/sprzedaz/mieszkanie/mazowieckie/warszawa"
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = ScoutConfig::parse(MINIMAL).unwrap();
        assert_eq!(config.rate_limit.request_delay(), Duration::from_secs(3));
        assert_eq!(config.ingest.plan(), IngestPlan::default());
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
        assert_eq!(config.extractor_settings().source_offset.local_minus_utc(), 3600);
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_full_config() {
        let config = ScoutConfig::parse(
            r#"
            [rate_limit]
            request_delay_ms = 500

            [source]
            utc_offset_minutes = 120

            [ingest]
            start_page = 2
            limit_pages_per_call = 3
            last_page = 9
            max_attempts = 2

            [storage]
            data_dir = "/var/lib/flat-scout"
            diagnostics_dir = "/var/lib/flat-scout/diag"

            [[filters]]
            name = "mokotow"
            base_url = "https://www.otodom.pl/pl/wyniki/sprzedaz/mieszkanie/mazowieckie/warszawa/mokotow"
            price_max = 900000
            per_page = 36
            [filters.query]
            roomsNumber = "[TWO,THREE]"

            [[filters]]
            name = "wola"
            base_url = "https://www.otodom.pl/pl/wyniki/sprzedaz/mieszkanie/mazowieckie/warszawa/wola"
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.request_delay(), Duration::from_millis(500));
        assert_eq!(
            config.ingest.plan(),
            IngestPlan {
                start_page: 2,
                limit_pages_per_call: 3,
                last_page: 9,
            }
        );
        assert_eq!(config.filters[0].price_max, Some(900_000));
        assert_eq!(config.filters[0].query["roomsNumber"], "[TWO,THREE]");
        let settings = config.extractor_settings();
        assert_eq!(settings.source_offset.local_minus_utc(), 7200);
        assert_eq!(settings.diagnostics_dir, Some(PathBuf::from("/var/lib/flat-scout/diag")));

        let selected = config.select_filters(&["wola".to_string()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "wola");
        assert!(config.select_filters(&["praga".to_string()]).is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let config = ScoutConfig::parse(include_str!("../flat-scout.example.toml")).unwrap();
        assert_eq!(config.filters[0].name, "warsaw-two-rooms");
        assert_eq!(config.ingest.max_attempts, 2);
    }

    #[test]
    fn test_rejects_invalid_configs() {
        let cases = [
            "filters = []",
            r#"
            [[filters]]
            name = "a/b"
            base_url = "https://example.com/"
            "#,
            r#"
            [[filters]]
            name = "a"
            base_url = "https://example.com/"
            [[filters]]
            name = "a"
            base_url = "https://example.com/other"
            "#,
            r#"
            [ingest]
            limit_pages_per_call = 0
            [[filters]]
            name = "a"
            base_url = "https://example.com/"
            "#,
            r#"
            [source]
            offer_base_url = "https://www.otodom.pl/pl/oferta"
            [[filters]]
            name = "a"
            base_url = "https://example.com/"
            "#,
        ];
        for case in cases {
            let err = ScoutConfig::parse(case).unwrap_err();
            assert_eq!(err.kind(), "config", "accepted: {case}");
        }
    }
}
