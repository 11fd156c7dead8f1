//! Expiry of unpaid orders.

use sqlx::PgPool;
use vitrin_core::OrderStatus;

use crate::DbError;

/// Advisory lock key held for the duration of an expiry run so that two
/// overlapping runs never both update orders.
pub const EXPIRY_LOCK_KEY: i64 = 0x7669_7472_696e_0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// Number of orders moved from `pending` to `expired`.
    Expired(u64),
    /// Another run held the lock; nothing was changed.
    Skipped,
}

/// Moves orders that have been `pending` for more than `older_than_hours`
/// to `expired`.
///
/// Runs inside one transaction holding `pg_try_advisory_xact_lock`; when the
/// lock is taken by a concurrent run this returns [`ExpiryOutcome::Skipped`]
/// without waiting.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn expire_pending_orders(
    pool: &PgPool,
    older_than_hours: u32,
) -> Result<ExpiryOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
        .bind(EXPIRY_LOCK_KEY)
        .fetch_one(&mut *tx)
        .await?;

    if !locked {
        tx.rollback().await?;
        tracing::info!("order expiry already running elsewhere; skipping");
        return Ok(ExpiryOutcome::Skipped);
    }

    let hours = i32::try_from(older_than_hours).unwrap_or(i32::MAX);
    let expirable: Vec<&str> = OrderStatus::sources_of(OrderStatus::Expired)
        .into_iter()
        .map(OrderStatus::as_str)
        .collect();
    let result = sqlx::query(
        "UPDATE orders \
         SET status = $1, expired_at = NOW(), updated_at = NOW() \
         WHERE status = ANY($2) AND created_at < NOW() - make_interval(hours => $3)",
    )
    .bind(OrderStatus::Expired.as_str())
    .bind(&expirable)
    .bind(hours)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(ExpiryOutcome::Expired(result.rows_affected()))
}
