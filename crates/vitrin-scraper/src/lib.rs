pub mod brands;
pub mod client;
pub mod error;
pub mod pagination;
pub mod parse;
pub mod recipe;
pub mod retry;
pub mod types;

pub use brands::{extractor_for, BrandExtractor};
pub use client::{GatewayClient, GatewayConfig};
pub use error::ScraperError;
pub use pagination::{paginate_offsets, PageSummary, MAX_PAGES};
pub use recipe::ParsingRecipe;
pub use retry::{retry_request, RetryPolicy};
pub use types::ParsedContent;
