use sqlx::PgPool;
use vitrin_core::catalog::slugify;
use vitrin_core::BrandConfig;

use crate::DbError;

/// Rows touched by [`seed_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub brands: usize,
    pub categories: usize,
    pub category_endpoints: usize,
}

/// Upsert brands, categories and category listing pages from config.
///
/// All upserts run inside a single transaction; if any operation fails the
/// entire batch is rolled back. Re-seeding never resets the crawl status of
/// a listing page that already exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_catalog(pool: &PgPool, brands: &[BrandConfig]) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();
    let mut seen_categories = std::collections::HashSet::new();

    for brand in brands {
        let brand_id: i64 = sqlx::query_scalar(
            "INSERT INTO brands (name, slug, kind, domain, is_active) \
             VALUES ($1, $2, $3, $4, true) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 kind = EXCLUDED.kind, \
                 domain = EXCLUDED.domain, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(&brand.name)
        .bind(brand.slug())
        .bind(brand.kind.as_str())
        .bind(&brand.domain)
        .fetch_one(&mut *tx)
        .await?;
        summary.brands += 1;

        for listing in &brand.categories {
            let category_slug = slugify(&listing.category);
            let category_id: i64 = sqlx::query_scalar(
                "INSERT INTO categories (name, slug) VALUES ($1, $2) \
                 ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, updated_at = NOW() \
                 RETURNING id",
            )
            .bind(&listing.category)
            .bind(&category_slug)
            .fetch_one(&mut *tx)
            .await?;
            if seen_categories.insert(category_slug) {
                summary.categories += 1;
            }

            sqlx::query(
                "INSERT INTO category_endpoints (brand_id, category_id, url) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (url) DO UPDATE SET \
                     brand_id = EXCLUDED.brand_id, \
                     category_id = EXCLUDED.category_id, \
                     updated_at = NOW()",
            )
            .bind(brand_id)
            .bind(category_id)
            .bind(&listing.url)
            .execute(&mut *tx)
            .await?;
            summary.category_endpoints += 1;
        }
    }

    tx.commit().await?;
    Ok(summary)
}
