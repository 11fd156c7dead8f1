use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub catalog_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Scraping gateway Basic Auth user. Only the scrape commands require it.
    pub gateway_username: Option<String>,
    pub gateway_password: Option<String>,
    pub gateway_endpoint: String,
    pub scraper_request_timeout_secs: u64,
    pub scraper_max_attempts: u32,
    /// Fixed sleep between attempts for product pages.
    pub scraper_retry_delay_secs: u64,
    /// Fixed sleep between attempts for category listing pages.
    pub scraper_listing_retry_delay_secs: u64,
    /// Pause between consecutive items in the detail and refresh loops.
    pub scraper_item_delay_secs: u64,
    /// Stock assigned to sizes reported as in stock (or with an unknown status).
    pub default_stock: i32,
    pub order_expiry_hours: u32,
}

impl AppConfig {
    /// Returns the gateway credentials when both halves are configured.
    #[must_use]
    pub fn gateway_credentials(&self) -> Option<(&str, &str)> {
        match (&self.gateway_username, &self.gateway_password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("catalog_path", &self.catalog_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "gateway_username",
                &self.gateway_username.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "gateway_password",
                &self.gateway_password.as_ref().map(|_| "[redacted]"),
            )
            .field("gateway_endpoint", &self.gateway_endpoint)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_max_attempts", &self.scraper_max_attempts)
            .field("scraper_retry_delay_secs", &self.scraper_retry_delay_secs)
            .field(
                "scraper_listing_retry_delay_secs",
                &self.scraper_listing_retry_delay_secs,
            )
            .field("scraper_item_delay_secs", &self.scraper_item_delay_secs)
            .field("default_stock", &self.default_stock)
            .field("order_expiry_hours", &self.order_expiry_hours)
            .finish()
    }
}
