//! Database operations for the `brands` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use vitrin_core::BrandKind;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `brands` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// `adidas` or `decathlon`; selects the extractor.
    pub kind: String,
    /// Storefront origin used to absolutize relative links.
    pub domain: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BrandRow {
    /// Parses the `kind` column.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] for a value the schema check should
    /// have rejected.
    pub fn brand_kind(&self) -> Result<BrandKind, DbError> {
        self.kind
            .parse::<BrandKind>()
            .map_err(|e| DbError::InvalidColumn {
                column: "brands.kind",
                reason: e.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns active brands ordered by name, optionally restricted to one kind.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_brands(
    pool: &PgPool,
    kind: Option<BrandKind>,
) -> Result<Vec<BrandRow>, DbError> {
    let rows = sqlx::query_as::<_, BrandRow>(
        "SELECT id, name, slug, kind, domain, is_active, created_at, updated_at \
         FROM brands \
         WHERE is_active = true AND ($1::text IS NULL OR kind = $1) \
         ORDER BY name",
    )
    .bind(kind.map(BrandKind::as_str))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
