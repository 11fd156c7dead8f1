//! Crawl queues: `category_endpoints` (listing pages) and `endpoints`
//! (product pages), plus the target selection used by the detail crawl and
//! the refresh job.
//!
//! Queue progress lives entirely in the `status` columns, so an interrupted
//! crawl resumes from where it stopped.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use vitrin_core::DiscoveredEndpoint;

use crate::DbError;

pub const STATUS_PENDING: i16 = 0;
pub const STATUS_DONE: i16 = 1;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `category_endpoints` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryEndpointRow {
    pub id: i64,
    pub brand_id: i64,
    pub category_id: i64,
    pub url: String,
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `endpoints` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EndpointRow {
    pub id: i64,
    pub url: String,
    pub brand_id: i64,
    pub category_id: i64,
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which endpoints the detail crawl visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailSelection {
    /// Not yet crawled, or crawled into a product that still has no sizes.
    #[default]
    Pending,
    /// Endpoints whose product is flagged as failed.
    Failed,
    /// Every endpoint of the brand.
    All,
}

/// Which products the refresh job re-scrapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshFilter {
    /// Select failed products instead of completed ones.
    pub failed_only: bool,
    /// Keep only products currently on discount.
    pub discounted_only: bool,
    /// `None` means no limit.
    pub limit: Option<i64>,
}

/// A product due for a stock and price refresh.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTarget {
    pub product_id: i64,
    pub url: String,
    pub brand_id: i64,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// category_endpoints
// ---------------------------------------------------------------------------

/// Returns the brand's listing pages that have not been crawled to the end.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pending_category_endpoints(
    pool: &PgPool,
    brand_id: i64,
) -> Result<Vec<CategoryEndpointRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryEndpointRow>(
        "SELECT id, brand_id, category_id, url, status, created_at, updated_at \
         FROM category_endpoints \
         WHERE brand_id = $1 AND status = $2 \
         ORDER BY id",
    )
    .bind(brand_id)
    .bind(STATUS_PENDING)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Marks a listing page as fully paginated.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_category_endpoint_done(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE category_endpoints SET status = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(STATUS_DONE)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// endpoints
// ---------------------------------------------------------------------------

/// Queues product pages, ignoring URLs that are already known.
///
/// Returns the number of newly inserted endpoints.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_endpoints(
    pool: &PgPool,
    endpoints: &[DiscoveredEndpoint],
) -> Result<u64, DbError> {
    let mut conn = pool.acquire().await?;
    insert_endpoints_on(&mut *conn, endpoints).await
}

/// [`insert_endpoints`] on an existing connection or transaction.
pub(crate) async fn insert_endpoints_on(
    conn: &mut PgConnection,
    endpoints: &[DiscoveredEndpoint],
) -> Result<u64, DbError> {
    if endpoints.is_empty() {
        return Ok(0);
    }

    let urls: Vec<&str> = endpoints.iter().map(|e| e.url.as_str()).collect();
    let brand_ids: Vec<i64> = endpoints.iter().map(|e| e.brand_id).collect();
    let category_ids: Vec<i64> = endpoints.iter().map(|e| e.category_id).collect();

    let result = sqlx::query(
        "INSERT INTO endpoints (url, brand_id, category_id) \
         SELECT DISTINCT ON (url) url, brand_id, category_id \
         FROM UNNEST($1::text[], $2::bigint[], $3::bigint[]) AS t (url, brand_id, category_id) \
         ON CONFLICT (url) DO NOTHING",
    )
    .bind(&urls)
    .bind(&brand_ids)
    .bind(&category_ids)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Marks a product page as crawled.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_endpoint_done(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE endpoints SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(STATUS_DONE)
            .bind(id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Endpoints the detail crawl should visit for `brand_id`, oldest first.
///
/// With [`DetailSelection::Pending`], endpoints still at status 0 come
/// before revisits of products stored without sizes.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn select_detail_targets(
    pool: &PgPool,
    brand_id: i64,
    selection: DetailSelection,
    limit: Option<i64>,
) -> Result<Vec<EndpointRow>, DbError> {
    // Never-crawled endpoints go first so that sizeless products revisited
    // on every run cannot starve the queue under a limit.
    let (filter, order) = match selection {
        DetailSelection::Pending => (
            "(e.status = 0 OR (p.id IS NOT NULL AND p.is_failed = false \
              AND NOT EXISTS (SELECT 1 FROM sizes s WHERE s.product_id = p.id)))",
            "(e.status = 0) DESC, e.id",
        ),
        DetailSelection::Failed => ("p.is_failed = true", "e.id"),
        DetailSelection::All => ("true", "e.id"),
    };

    let sql = format!(
        "SELECT e.id, e.url, e.brand_id, e.category_id, e.status, e.created_at, e.updated_at \
         FROM endpoints e \
         LEFT JOIN products p ON p.url = e.url \
         WHERE e.brand_id = $1 AND {filter} \
         ORDER BY {order} \
         LIMIT $2"
    );

    let rows = sqlx::query_as::<_, EndpointRow>(&sql)
        .bind(brand_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Products of `brand_id` due for a refresh, least recently updated first.
///
/// Without `failed_only` only completed products (not failed, at least one
/// size) are selected.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn select_refresh_targets(
    pool: &PgPool,
    brand_id: i64,
    filter: RefreshFilter,
) -> Result<Vec<RefreshTarget>, DbError> {
    let rows = sqlx::query_as::<_, RefreshTarget>(
        "SELECT p.id AS product_id, p.url, p.brand_id, p.updated_at \
         FROM products p \
         WHERE p.brand_id = $1 \
           AND (($2::boolean AND p.is_failed) \
                OR (NOT $2::boolean AND NOT p.is_failed \
                    AND EXISTS (SELECT 1 FROM sizes s WHERE s.product_id = p.id))) \
           AND (NOT $3::boolean OR p.discount > 0) \
         ORDER BY p.updated_at, p.id \
         LIMIT $4",
    )
    .bind(brand_id)
    .bind(filter.failed_only)
    .bind(filter.discounted_only)
    .bind(filter.limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
