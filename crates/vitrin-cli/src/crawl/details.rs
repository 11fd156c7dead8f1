use sqlx::PgPool;
use vitrin_core::{AppConfig, BrandKind};
use vitrin_db::{BrandRow, DetailSelection, EndpointRow, StoreOptions};
use vitrin_scraper::{extractor_for, BrandExtractor, GatewayClient, RetryPolicy};

use crate::runner::{
    begin_run, build_gateway_client, finish_run, item_delay, item_retry_policy, load_brands,
    ItemOutcome, RunTally, TRIGGER_CLI,
};

const RUN_TYPE: &str = "details";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DetailArgs {
    pub brand: BrandKind,
    pub selection: DetailSelection,
    /// `None` visits every selected endpoint.
    pub limit: Option<i64>,
}

/// Scrapes queued product pages of one brand into the catalog.
///
/// Items are visited one at a time with a fixed pause between them. A page
/// that is gone or lacks a title or price flags the product as failed and
/// closes the endpoint. A page that keeps failing to load is left for the
/// next run.
pub(crate) async fn run_detail_crawl(
    pool: &PgPool,
    config: &AppConfig,
    args: DetailArgs,
) -> anyhow::Result<()> {
    let brands = load_brands(pool, Some(args.brand)).await?;
    let client = build_gateway_client(config)?;
    let mut tally = RunTally::default();

    for brand in &brands {
        let Some(brand_tally) = crawl_brand(pool, config, &client, brand, args).await? else {
            continue;
        };
        tally.stored += brand_tally.stored;
        tally.invalid += brand_tally.invalid;
        tally.skipped += brand_tally.skipped;
        tally.errored += brand_tally.errored;
    }

    tracing::info!(
        brand = %args.brand,
        attempted = tally.attempted(),
        stored = tally.stored,
        "detail crawl finished"
    );
    Ok(())
}

/// Crawls the selected endpoints of one brand under its own scrape run.
/// Returns `None` when nothing was selected.
pub(crate) async fn crawl_brand(
    pool: &PgPool,
    config: &AppConfig,
    client: &GatewayClient,
    brand: &BrandRow,
    args: DetailArgs,
) -> anyhow::Result<Option<RunTally>> {
    let targets =
        vitrin_db::select_detail_targets(pool, brand.id, args.selection, args.limit).await?;
    if targets.is_empty() {
        println!("{}: no endpoints to crawl", brand.slug);
        return Ok(None);
    }

    let extractor = extractor_for(brand.brand_kind()?);
    let run_id = begin_run(pool, RUN_TYPE, Some(brand.id), TRIGGER_CLI).await?;
    let tally = crawl_targets(pool, config, client, extractor, &targets).await;
    finish_run(pool, run_id, RUN_TYPE, tally).await?;

    println!(
        "{}: {} stored, {} marked failed, {} skipped, {} errors",
        brand.slug, tally.stored, tally.invalid, tally.skipped, tally.errored
    );
    Ok(Some(tally))
}

async fn crawl_targets(
    pool: &PgPool,
    config: &AppConfig,
    client: &GatewayClient,
    extractor: &dyn BrandExtractor,
    targets: &[EndpointRow],
) -> RunTally {
    let policy = item_retry_policy(config);
    let options = StoreOptions {
        default_stock: config.default_stock,
        record_related: extractor.records_related_endpoints(),
    };
    let mut tally = RunTally::default();

    for (idx, target) in targets.iter().enumerate() {
        if idx > 0 {
            tokio::time::sleep(item_delay(config)).await;
        }
        let outcome = crawl_one(pool, client, extractor, &policy, options, target).await;
        tally.record(outcome);
    }
    tally
}

/// Scrapes and stores one endpoint. Never fails; the outcome says what
/// happened.
pub(crate) async fn crawl_one(
    pool: &PgPool,
    client: &GatewayClient,
    extractor: &dyn BrandExtractor,
    policy: &RetryPolicy,
    options: StoreOptions,
    target: &EndpointRow,
) -> ItemOutcome {
    let recipe = extractor.product_recipe();
    let scraped = client
        .fetch_with_retry(&target.url, &recipe, policy)
        .await
        .and_then(|content| extractor.clean_product_data(&content, &target.url));

    let product = match scraped {
        Ok(product) => product,
        Err(e) => {
            let outcome = ItemOutcome::from_scraper_error(&e);
            if outcome == ItemOutcome::Invalid {
                tracing::warn!(url = %target.url, error = %e, "invalid product page; marking failed");
                return mark_invalid(pool, target).await;
            }
            tracing::warn!(url = %target.url, error = %e, "product page unavailable; skipping");
            return outcome;
        }
    };

    let stored = match vitrin_db::store_product(
        pool,
        target.brand_id,
        target.category_id,
        &target.url,
        &product,
        options,
    )
    .await
    {
        Ok(stored) => stored,
        Err(e) => {
            tracing::error!(url = %target.url, error = %e, "failed to store product");
            return ItemOutcome::Errored;
        }
    };

    if let Err(e) = vitrin_db::mark_endpoint_done(pool, target.id).await {
        tracing::error!(url = %target.url, error = %e, "failed to mark endpoint done");
        return ItemOutcome::Errored;
    }

    tracing::info!(
        url = %target.url,
        product_id = stored.product_id,
        sizes = stored.sizes,
        images = stored.images,
        new_endpoints = stored.new_endpoints,
        "product stored"
    );
    ItemOutcome::Stored
}

async fn mark_invalid(pool: &PgPool, target: &EndpointRow) -> ItemOutcome {
    if let Err(e) = vitrin_db::mark_product_failed(pool, target.brand_id, &target.url).await {
        tracing::error!(url = %target.url, error = %e, "failed to flag product");
        return ItemOutcome::Errored;
    }
    if let Err(e) = vitrin_db::mark_endpoint_done(pool, target.id).await {
        tracing::error!(url = %target.url, error = %e, "failed to mark endpoint done");
        return ItemOutcome::Errored;
    }
    ItemOutcome::Invalid
}
