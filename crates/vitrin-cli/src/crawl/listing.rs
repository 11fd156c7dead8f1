use std::cell::Cell;

use sqlx::PgPool;
use vitrin_core::{AppConfig, BrandKind};
use vitrin_db::{BrandRow, CategoryEndpointRow};
use vitrin_scraper::{extractor_for, paginate_offsets, BrandExtractor, GatewayClient, MAX_PAGES};

use crate::runner::{begin_run, build_gateway_client, finish_run, listing_retry_policy, RunTally};
use crate::runner::{ItemOutcome, TRIGGER_CLI};

const RUN_TYPE: &str = "listing";

/// Result of walking one category listing to its last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CategoryCrawl {
    pub pages: usize,
    pub found: usize,
    pub inserted: u64,
}

/// Crawls every pending category listing of the selected brands.
///
/// A category is marked done only after its last page was read; a category
/// that fails part-way keeps its pending status and is walked again from
/// page one next time. Endpoints already inserted from earlier pages stay.
pub(crate) async fn run_listing_crawl(
    pool: &PgPool,
    config: &AppConfig,
    brand: Option<BrandKind>,
) -> anyhow::Result<()> {
    let brands = crate::runner::load_brands(pool, brand).await?;
    if brands.is_empty() {
        println!("no active brands; run `db seed` first");
        return Ok(());
    }

    let client = build_gateway_client(config)?;
    let run_brand_id = match brands.as_slice() {
        [only] => Some(only.id),
        _ => None,
    };
    let run_id = begin_run(pool, RUN_TYPE, run_brand_id, TRIGGER_CLI).await?;

    let mut tally = RunTally::default();
    let mut inserted_total = 0u64;

    for brand in &brands {
        let kind = match brand.brand_kind() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::error!(brand = %brand.slug, error = %e, "skipping brand");
                tally.record(ItemOutcome::Errored);
                continue;
            }
        };
        let extractor = extractor_for(kind);

        let pending = match vitrin_db::list_pending_category_endpoints(pool, brand.id).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(brand = %brand.slug, error = %e, "failed to load category listings");
                tally.record(ItemOutcome::Errored);
                continue;
            }
        };
        tracing::info!(brand = %brand.slug, categories = pending.len(), "crawling listings");

        for category in &pending {
            match crawl_category(pool, config, &client, extractor, brand, category).await {
                Ok(crawl) => {
                    inserted_total += crawl.inserted;
                    tracing::info!(
                        brand = %brand.slug,
                        listing_url = %category.url,
                        pages = crawl.pages,
                        found = crawl.found,
                        inserted = crawl.inserted,
                        "category listing done"
                    );
                    match vitrin_db::mark_category_endpoint_done(pool, category.id).await {
                        Ok(()) => tally.record(ItemOutcome::Stored),
                        Err(e) => {
                            tracing::error!(listing_url = %category.url, error = %e, "failed to mark listing done");
                            tally.record(ItemOutcome::Errored);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        brand = %brand.slug,
                        listing_url = %category.url,
                        error = %format!("{e:#}"),
                        "category listing failed; left pending"
                    );
                    tally.record(ItemOutcome::Skipped);
                }
            }
        }
    }

    finish_run(pool, run_id, RUN_TYPE, tally).await?;
    println!(
        "listing crawl: {} categories done, {} failed, {inserted_total} new endpoints",
        tally.processed(),
        tally.failed()
    );
    Ok(())
}

/// Walks one category listing page by page, inserting endpoints as each page
/// arrives.
pub(crate) async fn crawl_category(
    pool: &PgPool,
    config: &AppConfig,
    client: &GatewayClient,
    extractor: &dyn BrandExtractor,
    brand: &BrandRow,
    category: &CategoryEndpointRow,
) -> anyhow::Result<CategoryCrawl> {
    let policy = listing_retry_policy(config);
    let recipe = extractor.listing_recipe();
    let inserted = Cell::new(0u64);

    let summary = paginate_offsets(
        &category.url,
        extractor.page_size(),
        MAX_PAGES,
        |offset| {
            let inserted = &inserted;
            let policy = &policy;
            let recipe = &recipe;
            async move {
                let page_url = extractor.listing_page_url(&category.url, offset)?;
                let content = client.fetch_with_retry(&page_url, recipe, policy).await?;
                let found = extractor.clean_product_list(
                    &content,
                    brand.id,
                    category.category_id,
                    &brand.domain,
                );
                let new = vitrin_db::insert_endpoints(pool, &found).await?;
                inserted.set(inserted.get() + new);
                tracing::debug!(%page_url, found = found.len(), new, "listing page stored");
                Ok::<usize, anyhow::Error>(found.len())
            }
        },
    )
    .await?;

    Ok(CategoryCrawl {
        pages: summary.pages,
        found: summary.items,
        inserted: inserted.get(),
    })
}
