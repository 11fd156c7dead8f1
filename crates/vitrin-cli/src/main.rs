mod crawl;
mod orders;
mod refresh;
mod runner;
mod schedule;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vitrin_core::BrandKind;

use crate::crawl::CrawlCommands;
use crate::orders::OrderCommands;

#[derive(Debug, Parser)]
#[command(name = "vitrin-cli")]
#[command(about = "Vitrin catalog scraping and sync pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Crawl category listings or product pages into the catalog
    Crawl {
        #[command(subcommand)]
        command: CrawlCommands,
    },
    /// Re-scrape price, discount and per-size stock of stored products
    Refresh {
        /// Brand whose products are refreshed
        #[arg(long)]
        brand: BrandKind,

        /// Maximum number of products to refresh
        #[arg(long, default_value_t = 50)]
        limit: i64,

        /// Refresh products flagged as failed instead of completed ones
        #[arg(long)]
        failed: bool,

        /// Ignore --limit and refresh every selected product
        #[arg(long)]
        all: bool,

        /// Only refresh products that are currently discounted
        #[arg(long)]
        discount: bool,
    },
    /// Order lifecycle jobs
    Orders {
        #[command(subcommand)]
        command: OrderCommands,
    },
    /// Run scheduled jobs (hourly order expiry) until interrupted
    Schedule,
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert brands, categories and listing pages from the catalog file
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("vitrin-cli: no command given; run with --help for usage");
        return Ok(());
    };

    let config = Arc::new(vitrin_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(colored_logs(&config.env))
        .init();
    tracing::info!(env = %config.env, "configuration loaded");

    let pool_config = vitrin_db::PoolConfig::from_app_config(&config);
    let pool = vitrin_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => run_db_command(&pool, &config, command).await,
        Commands::Crawl { command } => crawl::run_crawl_command(&pool, &config, command).await,
        Commands::Refresh {
            brand,
            limit,
            failed,
            all,
            discount,
        } => {
            let args = refresh::RefreshArgs {
                brand,
                limit: (!all).then_some(limit),
                failed,
                discount,
            };
            refresh::run_refresh(&pool, &config, args).await
        }
        Commands::Orders { command } => orders::run_order_command(&pool, &config, command).await,
        Commands::Schedule => schedule::run_schedule(pool, Arc::clone(&config)).await,
    }
}

/// ANSI colors everywhere except production.
fn colored_logs(env: &vitrin_core::Environment) -> bool {
    !matches!(env, vitrin_core::Environment::Production)
}

async fn run_db_command(
    pool: &sqlx::PgPool,
    config: &vitrin_core::AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            vitrin_db::ping(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = vitrin_db::run_migrations(pool).await?;
            println!("applied {applied} migrations");
        }
        DbCommands::Seed => {
            let catalog = vitrin_core::load_catalog(&config.catalog_path)?;
            let summary = vitrin_db::seed_catalog(pool, &catalog.brands).await?;
            println!(
                "seeded {} brands, {} categories, {} listing pages",
                summary.brands, summary.categories, summary.category_endpoints
            );
        }
    }
    Ok(())
}
