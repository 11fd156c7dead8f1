//! Catalog writer: products, their category links, sizes and image files.
//!
//! Every write is an upsert keyed by `products.url` or by the child's
//! composite key (`(product_id, code)` for sizes, `(product_id, path, type)`
//! for files), so storing the same scrape twice leaves the catalog unchanged.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use vitrin_core::{DiscoveredEndpoint, ScrapedProduct, ScrapedSize};

use crate::endpoints::insert_endpoints_on;
use crate::{to_i32, DbError};

const IMAGE_FILE_TYPE: &str = "image";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub brand_id: i64,
    pub url: String,
    /// `NULL` for products that have only ever failed to scrape.
    pub title: Option<String>,
    pub price: i64,
    pub discount: i32,
    pub image: Option<String>,
    pub stock: i32,
    pub is_failed: bool,
    pub related_products: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `sizes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SizeRow {
    pub id: i64,
    pub product_id: i64,
    pub code: String,
    pub stock: i32,
    pub priority: i32,
}

/// A row from the `files` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileRow {
    pub id: i64,
    pub product_id: i64,
    pub path: String,
    #[sqlx(rename = "type")]
    pub file_type: String,
    pub priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Stock for sizes reported in stock or with an unknown status.
    pub default_stock: i32,
    /// Queue the product's related products as new endpoints.
    pub record_related: bool,
}

/// What [`store_product`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredProduct {
    pub product_id: i64,
    pub sizes: usize,
    pub images: usize,
    /// Related-product endpoints that were not already queued.
    pub new_endpoints: u64,
}

/// What [`refresh_product`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshedProduct {
    pub sizes: usize,
    /// Previously stocked sizes the storefront no longer lists.
    pub zeroed_sizes: u64,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Stores a scraped product found under `category_id`, in one transaction.
///
/// - The product row is upserted by `url` and its failure flag cleared.
/// - The category link is added; existing links to other categories stay.
/// - Sizes are upserted by code with `priority` = position on the page;
///   stock comes from the stock mapping. Sizes missing from the scrape drop
///   to zero stock.
/// - Images are upserted by path with `priority` = `count - index`, so the
///   first image ranks highest.
/// - With `options.record_related`, related URLs are queued as pending
///   endpoints of the same brand and category.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written in
/// that case.
pub async fn store_product(
    pool: &PgPool,
    brand_id: i64,
    category_id: i64,
    url: &str,
    product: &ScrapedProduct,
    options: StoreOptions,
) -> Result<StoredProduct, DbError> {
    let mut tx = pool.begin().await?;

    let related = Value::from(product.related_products.clone());
    let product_id: i64 = sqlx::query_scalar(
        "INSERT INTO products \
             (brand_id, url, title, price, discount, image, stock, is_failed, related_products) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, false, $8) \
         ON CONFLICT (url) DO UPDATE SET \
             brand_id         = EXCLUDED.brand_id, \
             title            = EXCLUDED.title, \
             price            = EXCLUDED.price, \
             discount         = EXCLUDED.discount, \
             image            = COALESCE(EXCLUDED.image, products.image), \
             stock            = EXCLUDED.stock, \
             is_failed        = false, \
             related_products = EXCLUDED.related_products, \
             updated_at       = NOW() \
         RETURNING id",
    )
    .bind(brand_id)
    .bind(url)
    .bind(&product.title)
    .bind(product.price)
    .bind(product.discount)
    .bind(product.primary_image())
    .bind(product.total_stock(options.default_stock))
    .bind(&related)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO category_product (category_id, product_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(category_id)
    .bind(product_id)
    .execute(&mut *tx)
    .await?;

    upsert_sizes(&mut *tx, product_id, &product.sizes, options.default_stock).await?;
    zero_missing_sizes(&mut *tx, product_id, &product.sizes).await?;

    let image_count = product.images.len();
    for (idx, path) in product.images.iter().enumerate() {
        sqlx::query(
            "INSERT INTO files (product_id, path, type, priority) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (product_id, path, type) DO UPDATE SET \
                 priority   = EXCLUDED.priority, \
                 updated_at = NOW()",
        )
        .bind(product_id)
        .bind(path)
        .bind(IMAGE_FILE_TYPE)
        .bind(to_i32("files.priority", image_count - idx)?)
        .execute(&mut *tx)
        .await?;
    }

    let new_endpoints = if options.record_related {
        let related: Vec<DiscoveredEndpoint> = product
            .related_products
            .iter()
            .filter(|related_url| related_url.as_str() != url)
            .map(|related_url| DiscoveredEndpoint {
                url: related_url.clone(),
                brand_id,
                category_id,
            })
            .collect();
        insert_endpoints_on(&mut *tx, &related).await?
    } else {
        0
    };

    tx.commit().await?;

    tracing::debug!(
        product_id,
        url,
        sizes = product.sizes.len(),
        images = image_count,
        new_endpoints,
        "product stored"
    );

    Ok(StoredProduct {
        product_id,
        sizes: product.sizes.len(),
        images: image_count,
        new_endpoints,
    })
}

/// Flags the product at `url` as failed, creating a title-less row if the
/// product has never been stored.
///
/// Returns the product id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn mark_product_failed(pool: &PgPool, brand_id: i64, url: &str) -> Result<i64, DbError> {
    let product_id: i64 = sqlx::query_scalar(
        "INSERT INTO products (brand_id, url, is_failed) VALUES ($1, $2, true) \
         ON CONFLICT (url) DO UPDATE SET is_failed = true, updated_at = NOW() \
         RETURNING id",
    )
    .bind(brand_id)
    .bind(url)
    .fetch_one(pool)
    .await?;

    Ok(product_id)
}

/// Applies a re-scrape to an existing product: title, price, discount and
/// stock are replaced, the failure flag is cleared and sizes are upserted.
/// Sizes the storefront no longer lists drop to zero stock. Images and
/// category links are left alone.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if `product_id` does not exist, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn refresh_product(
    pool: &PgPool,
    product_id: i64,
    product: &ScrapedProduct,
    default_stock: i32,
) -> Result<RefreshedProduct, DbError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE products SET \
             title      = $1, \
             price      = $2, \
             discount   = $3, \
             stock      = $4, \
             image      = COALESCE(image, $5), \
             is_failed  = false, \
             updated_at = NOW() \
         WHERE id = $6",
    )
    .bind(&product.title)
    .bind(product.price)
    .bind(product.discount)
    .bind(product.total_stock(default_stock))
    .bind(product.primary_image())
    .bind(product_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    upsert_sizes(&mut *tx, product_id, &product.sizes, default_stock).await?;
    let zeroed_sizes = zero_missing_sizes(&mut *tx, product_id, &product.sizes).await?;

    tx.commit().await?;

    Ok(RefreshedProduct {
        sizes: product.sizes.len(),
        zeroed_sizes,
    })
}

async fn upsert_sizes(
    conn: &mut PgConnection,
    product_id: i64,
    sizes: &[ScrapedSize],
    default_stock: i32,
) -> Result<(), DbError> {
    for (idx, size) in sizes.iter().enumerate() {
        sqlx::query(
            "INSERT INTO sizes (product_id, code, stock, priority) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (product_id, code) DO UPDATE SET \
                 stock      = EXCLUDED.stock, \
                 priority   = EXCLUDED.priority, \
                 updated_at = NOW()",
        )
        .bind(product_id)
        .bind(&size.code)
        .bind(size.status.stock(default_stock))
        .bind(to_i32("sizes.priority", idx)?)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn zero_missing_sizes(
    conn: &mut PgConnection,
    product_id: i64,
    sizes: &[ScrapedSize],
) -> Result<u64, DbError> {
    let codes: Vec<&str> = sizes.iter().map(|s| s.code.as_str()).collect();
    let result = sqlx::query(
        "UPDATE sizes SET stock = 0, updated_at = NOW() \
         WHERE product_id = $1 AND stock <> 0 AND NOT (code = ANY($2::text[]))",
    )
    .bind(product_id)
    .bind(&codes)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns the product stored under `url`, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product_by_url(pool: &PgPool, url: &str) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, brand_id, url, title, price, discount, image, stock, is_failed, \
                related_products, created_at, updated_at \
         FROM products \
         WHERE url = $1",
    )
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Sizes of a product in page order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sizes(pool: &PgPool, product_id: i64) -> Result<Vec<SizeRow>, DbError> {
    let rows = sqlx::query_as::<_, SizeRow>(
        "SELECT id, product_id, code, stock, priority \
         FROM sizes WHERE product_id = $1 ORDER BY priority, id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Files of a product, highest priority first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_files(pool: &PgPool, product_id: i64) -> Result<Vec<FileRow>, DbError> {
    let rows = sqlx::query_as::<_, FileRow>(
        "SELECT id, product_id, path, type, priority \
         FROM files WHERE product_id = $1 ORDER BY priority DESC, id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
