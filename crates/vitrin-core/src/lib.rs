pub mod app_config;
pub mod catalog;
pub mod config;
pub mod orders;
pub mod products;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{load_catalog, BrandConfig, CatalogFile, CategoryListing};
pub use config::{load_app_config, load_app_config_from_env};
pub use orders::OrderStatus;
pub use products::{
    BrandKind, DiscoveredEndpoint, ScrapedProduct, ScrapedSize, StockStatus, LOW_STOCK,
};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown brand kind: {0}")]
    UnknownBrand(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[from] serde_yaml::Error),
    #[error("catalog validation failed: {0}")]
    Validation(String),
}
