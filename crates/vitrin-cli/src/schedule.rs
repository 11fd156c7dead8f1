//! Long-running scheduler for recurring jobs.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use vitrin_core::AppConfig;
use vitrin_db::ExpiryOutcome;

/// Top of every hour, in the scheduler's six-field cron syntax.
pub(crate) const ORDER_EXPIRY_CRON: &str = "0 0 * * * *";

/// Starts the scheduler and blocks until Ctrl-C.
pub(crate) async fn run_schedule(pool: PgPool, config: Arc<AppConfig>) -> anyhow::Result<()> {
    let mut scheduler = build_scheduler(pool, config).await?;
    tracing::info!("scheduler running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    scheduler.shutdown().await?;
    Ok(())
}

/// Builds and starts the job scheduler. Dropping the returned handle stops
/// every job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, a
/// job cannot be registered, or the scheduler fails to start.
pub(crate) async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_order_expiry_job(&scheduler, pool, config).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Hourly expiry of pending orders. Overlapping runs, in this process or
/// another, are skipped by the advisory lock taken in the database.
async fn register_order_expiry_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(ORDER_EXPIRY_CRON, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting order expiry");
            match crate::orders::expire_pending(&pool, config.order_expiry_hours).await {
                Ok(ExpiryOutcome::Expired(count)) => {
                    tracing::info!(count, "scheduler: order expiry complete");
                }
                Ok(ExpiryOutcome::Skipped) => {
                    tracing::info!("scheduler: order expiry overlapped another run; skipped");
                }
                Err(e) => {
                    tracing::error!(error = %format!("{e:#}"), "scheduler: order expiry failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
