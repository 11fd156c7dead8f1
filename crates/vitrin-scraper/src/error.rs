use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("gateway returned no results for {url}")]
    EmptyResult { url: String },

    #[error("rate limited by scraping gateway (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid page structure at {url}: {reason}")]
    InvalidData { url: String, reason: String },

    #[error("pagination limit reached for {url}: exceeded {max_pages} pages")]
    PaginationLimit { url: String, max_pages: usize },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ScraperError {
    /// `true` for connection-class failures worth another attempt: network
    /// errors, gateway throttling, and 5xx from either the gateway or the
    /// target site.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ScraperError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            ScraperError::RateLimited { .. } => true,
            ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
            ScraperError::Deserialize { .. }
            | ScraperError::EmptyResult { .. }
            | ScraperError::NotFound { .. }
            | ScraperError::InvalidData { .. }
            | ScraperError::PaginationLimit { .. }
            | ScraperError::InvalidUrl { .. } => false,
        }
    }

    /// `true` when the page was reached but its content cannot become a
    /// product: the caller should flag the product as failed.
    #[must_use]
    pub fn is_invalid_page(&self) -> bool {
        matches!(
            self,
            ScraperError::InvalidData { .. } | ScraperError::NotFound { .. }
        )
    }
}
