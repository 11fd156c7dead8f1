//! `crawl` subcommands: category listings into endpoints, endpoints into
//! products.

mod details;
mod listing;

use clap::Subcommand;
use sqlx::PgPool;
use vitrin_core::{AppConfig, BrandKind};
use vitrin_db::DetailSelection;

pub(crate) use details::{run_detail_crawl, DetailArgs};
pub(crate) use listing::run_listing_crawl;

#[derive(Debug, Subcommand)]
pub(crate) enum CrawlCommands {
    /// Walk every pending category listing and queue the product URLs found
    Listing {
        /// Restrict to one brand
        #[arg(long)]
        brand: Option<BrandKind>,
    },
    /// Scrape queued product pages into products, sizes and images
    Details {
        /// Brand whose endpoints are crawled
        #[arg(long)]
        brand: BrandKind,

        /// Maximum number of endpoints to visit
        #[arg(long, default_value_t = 100)]
        limit: i64,

        /// Retry endpoints whose product is flagged as failed
        #[arg(long, conflicts_with = "all")]
        failed: bool,

        /// Revisit every endpoint of the brand, ignoring --limit
        #[arg(long)]
        all: bool,
    },
}

pub(crate) async fn run_crawl_command(
    pool: &PgPool,
    config: &AppConfig,
    command: CrawlCommands,
) -> anyhow::Result<()> {
    match command {
        CrawlCommands::Listing { brand } => run_listing_crawl(pool, config, brand).await,
        CrawlCommands::Details {
            brand,
            limit,
            failed,
            all,
        } => {
            let args = DetailArgs::from_flags(brand, limit, failed, all);
            run_detail_crawl(pool, config, args).await
        }
    }
}

impl DetailArgs {
    pub(crate) fn from_flags(brand: BrandKind, limit: i64, failed: bool, all: bool) -> Self {
        let selection = if all {
            DetailSelection::All
        } else if failed {
            DetailSelection::Failed
        } else {
            DetailSelection::Pending
        };
        Self {
            brand,
            selection,
            limit: (!all).then_some(limit),
        }
    }
}

#[cfg(test)]
#[path = "crawl_test.rs"]
mod tests;
