//! `orders` subcommands.

use clap::Subcommand;
use sqlx::PgPool;
use vitrin_core::AppConfig;
use vitrin_db::ExpiryOutcome;

#[derive(Debug, Subcommand)]
pub(crate) enum OrderCommands {
    /// Expire orders left pending longer than the configured window
    ExpirePending {
        /// Override ORDER_EXPIRY_HOURS for this run
        #[arg(long)]
        older_than_hours: Option<u32>,
    },
}

pub(crate) async fn run_order_command(
    pool: &PgPool,
    config: &AppConfig,
    command: OrderCommands,
) -> anyhow::Result<()> {
    match command {
        OrderCommands::ExpirePending { older_than_hours } => {
            let hours = older_than_hours.unwrap_or(config.order_expiry_hours);
            match expire_pending(pool, hours).await? {
                ExpiryOutcome::Expired(count) => println!("expired {count} pending orders"),
                ExpiryOutcome::Skipped => println!("order expiry already running; skipped"),
            }
            Ok(())
        }
    }
}

/// Runs one expiry pass and logs the outcome.
pub(crate) async fn expire_pending(pool: &PgPool, hours: u32) -> anyhow::Result<ExpiryOutcome> {
    let outcome = vitrin_db::expire_pending_orders(pool, hours).await?;
    if let ExpiryOutcome::Expired(count) = outcome {
        tracing::info!(count, older_than_hours = hours, "pending orders expired");
    }
    Ok(outcome)
}
