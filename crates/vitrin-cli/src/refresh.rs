//! Re-scrapes stored products to keep price, discount and stock current.

use sqlx::PgPool;
use vitrin_core::{AppConfig, BrandKind};
use vitrin_db::{RefreshFilter, RefreshTarget};
use vitrin_scraper::{extractor_for, BrandExtractor, GatewayClient, RetryPolicy};

use crate::runner::{
    begin_run, build_gateway_client, finish_run, item_delay, item_retry_policy, load_brands,
    ItemOutcome, RunTally, TRIGGER_CLI,
};

const RUN_TYPE: &str = "refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RefreshArgs {
    pub brand: BrandKind,
    /// `None` refreshes every selected product.
    pub limit: Option<i64>,
    pub failed: bool,
    pub discount: bool,
}

impl RefreshArgs {
    pub(crate) fn filter(&self) -> RefreshFilter {
        RefreshFilter {
            failed_only: self.failed,
            discounted_only: self.discount,
            limit: self.limit,
        }
    }
}

pub(crate) async fn run_refresh(
    pool: &PgPool,
    config: &AppConfig,
    args: RefreshArgs,
) -> anyhow::Result<()> {
    let brands = load_brands(pool, Some(args.brand)).await?;
    let client = build_gateway_client(config)?;
    let policy = item_retry_policy(config);

    for brand in &brands {
        let targets = vitrin_db::select_refresh_targets(pool, brand.id, args.filter()).await?;
        if targets.is_empty() {
            println!("{}: nothing to refresh", brand.slug);
            continue;
        }

        let extractor = extractor_for(brand.brand_kind()?);
        let run_id = begin_run(pool, RUN_TYPE, Some(brand.id), TRIGGER_CLI).await?;
        let mut tally = RunTally::default();

        for (idx, target) in targets.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(item_delay(config)).await;
            }
            let outcome =
                refresh_one(pool, config, &client, extractor, &policy, target).await;
            tally.record(outcome);
        }

        finish_run(pool, run_id, RUN_TYPE, tally).await?;
        println!(
            "{}: {} refreshed, {} marked failed, {} skipped, {} errors",
            brand.slug, tally.stored, tally.invalid, tally.skipped, tally.errored
        );
    }
    Ok(())
}

/// Refreshes one product. Never fails; the outcome says what happened.
pub(crate) async fn refresh_one(
    pool: &PgPool,
    config: &AppConfig,
    client: &GatewayClient,
    extractor: &dyn BrandExtractor,
    policy: &RetryPolicy,
    target: &RefreshTarget,
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
            if outcome == ItemOutcome::Skipped {
                tracing::warn!(url = %target.url, error = %e, "product page unavailable; skipping");
                return outcome;
            }
            tracing::warn!(url = %target.url, error = %e, "invalid product page; marking failed");
            return match vitrin_db::mark_product_failed(pool, target.brand_id, &target.url).await
            {
                Ok(_) => ItemOutcome::Invalid,
                Err(e) => {
                    tracing::error!(url = %target.url, error = %e, "failed to flag product");
                    ItemOutcome::Errored
                }
            };
        }
    };

    match vitrin_db::refresh_product(pool, target.product_id, &product, config.default_stock).await
    {
        Ok(refreshed) => {
            tracing::info!(
                url = %target.url,
                product_id = target.product_id,
                price = product.price,
                discount = product.discount,
                sizes = refreshed.sizes,
                zeroed_sizes = refreshed.zeroed_sizes,
                "product refreshed"
            );
            ItemOutcome::Stored
        }
        Err(e) => {
            tracing::error!(url = %target.url, error = %e, "failed to refresh product");
            ItemOutcome::Errored
        }
    }
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;
