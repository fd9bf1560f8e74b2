use std::path::PathBuf;

use reqwest::StatusCode;

/// Every failure the scout can report.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A response arrived with a status the caller does not accept.
    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },

    /// A listing page without a usable embedded data block.
    #[error("malformed listing page {url}: {reason}")]
    MalformedPage { url: String, reason: String },

    /// A results page that is not the "no results" page yet parsed to nothing.
    #[error("page {page} ({url}) is not terminal but yielded no listings")]
    InconsistentPage { url: String, page: u32 },

    #[error("invalid listing: {message}")]
    Validation { message: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScoutError>;

impl ScoutError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn malformed_page(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPage {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short stable name of the failure class, for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } | Self::Status { .. } => "transport",
            Self::MalformedPage { .. } => "malformed_page",
            Self::InconsistentPage { .. } => "inconsistent_page",
            Self::Validation { .. } => "validation",
            Self::Storage(_) => "storage",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
            Self::Json(_) => "json",
        }
    }
}
