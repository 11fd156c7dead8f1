//! Pieces shared by the crawl and refresh commands: gateway setup, brand
//! selection, per-item outcome bookkeeping and the scrape-run lifecycle.

use std::time::Duration;

use sqlx::PgPool;
use vitrin_core::{AppConfig, BrandKind};
use vitrin_db::BrandRow;
use vitrin_scraper::{GatewayClient, GatewayConfig, RetryPolicy, ScraperError};

pub(crate) const TRIGGER_CLI: &str = "cli";

pub(crate) fn build_gateway_client(config: &AppConfig) -> anyhow::Result<GatewayClient> {
    let Some((username, password)) = config.gateway_credentials() else {
        anyhow::bail!("OXYLABS_USERNAME and OXYLABS_PASSWORD must be set to scrape");
    };

    let client = GatewayClient::new(GatewayConfig {
        endpoint: config.gateway_endpoint.clone(),
        username: username.to_owned(),
        password: password.to_owned(),
        timeout_secs: config.scraper_request_timeout_secs,
    })?;
    Ok(client)
}

/// Retry policy for category listing pages.
pub(crate) fn listing_retry_policy(config: &AppConfig) -> RetryPolicy {
    RetryPolicy::from_secs(
        config.scraper_max_attempts,
        config.scraper_listing_retry_delay_secs,
    )
}

/// Retry policy for product detail pages.
pub(crate) fn item_retry_policy(config: &AppConfig) -> RetryPolicy {
    RetryPolicy::from_secs(config.scraper_max_attempts, config.scraper_retry_delay_secs)
}

pub(crate) fn item_delay(config: &AppConfig) -> Duration {
    Duration::from_secs(config.scraper_item_delay_secs)
}

/// Active brands, optionally narrowed to one kind.
///
/// # Errors
///
/// Fails when `kind` is given but no active brand of that kind is seeded.
pub(crate) async fn load_brands(
    pool: &PgPool,
    kind: Option<BrandKind>,
) -> anyhow::Result<Vec<BrandRow>> {
    let brands = vitrin_db::list_active_brands(pool, kind).await?;
    if let Some(kind) = kind {
        if brands.is_empty() {
            anyhow::bail!("no active brand of kind '{kind}'; run `db seed` first");
        }
    }
    Ok(brands)
}

/// What happened to one product page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemOutcome {
    /// Scraped and written.
    Stored,
    /// The page is gone or unusable; the product was flagged as failed.
    Invalid,
    /// A connection-class error survived every retry; left for a later run.
    Skipped,
    /// The database rejected the write.
    Errored,
}

impl ItemOutcome {
    /// Classifies a scraper error that ended an item.
    pub(crate) fn from_scraper_error(err: &ScraperError) -> Self {
        if err.is_invalid_page() {
            Self::Invalid
        } else {
            Self::Skipped
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RunTally {
    pub stored: usize,
    pub invalid: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl RunTally {
    pub(crate) fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Stored => self.stored += 1,
            ItemOutcome::Invalid => self.invalid += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Errored => self.errored += 1,
        }
    }

    pub(crate) fn attempted(&self) -> usize {
        self.stored + self.invalid + self.skipped + self.errored
    }

    /// Items that reached a final state in the catalog.
    pub(crate) fn processed(&self) -> usize {
        self.stored + self.invalid
    }

    pub(crate) fn failed(&self) -> usize {
        self.invalid + self.skipped + self.errored
    }

    /// `true` when items were attempted and none reached a final state.
    pub(crate) fn all_failed(&self) -> bool {
        self.attempted() > 0 && self.processed() == 0
    }
}

/// Creates a scrape run and moves it to `running`.
pub(crate) async fn begin_run(
    pool: &PgPool,
    run_type: &str,
    brand_id: Option<i64>,
    trigger_source: &str,
) -> anyhow::Result<i64> {
    let run = vitrin_db::create_scrape_run(pool, run_type, brand_id, trigger_source).await?;
    if let Err(e) = vitrin_db::start_scrape_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, run_type, format!("failed to start run: {e:#}")).await;
        return Err(e.into());
    }
    tracing::info!(run_id = run.id, run_type, brand_id, trigger_source, "scrape run started");
    Ok(run.id)
}

/// Closes a run from its tally: `failed` when every attempted item failed,
/// `succeeded` otherwise.
pub(crate) async fn finish_run(
    pool: &PgPool,
    run_id: i64,
    run_type: &'static str,
    tally: RunTally,
) -> anyhow::Result<()> {
    if tally.all_failed() {
        let message = format!("all {} items failed", tally.attempted());
        fail_run_best_effort(pool, run_id, run_type, message.clone()).await;
        anyhow::bail!("{run_type} run {run_id}: {message}");
    }

    let processed = saturating_i32(tally.processed());
    let failed = saturating_i32(tally.failed());
    if let Err(e) = vitrin_db::complete_scrape_run(pool, run_id, processed, failed).await {
        fail_run_best_effort(
            pool,
            run_id,
            run_type,
            format!("failed to complete run: {e:#}"),
        )
        .await;
        return Err(e.into());
    }

    tracing::info!(
        run_id,
        run_type,
        stored = tally.stored,
        invalid = tally.invalid,
        skipped = tally.skipped,
        errored = tally.errored,
        "scrape run completed"
    );
    Ok(())
}

/// Marks the run as failed; a failure to do so is only logged.
pub(crate) async fn fail_run_best_effort(
    pool: &PgPool,
    run_id: i64,
    context: &str,
    message: String,
) {
    if let Err(mark_err) = vitrin_db::fail_scrape_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            context,
            error = %mark_err,
            "failed to mark scrape run as failed"
        );
    }
}

fn saturating_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
