//! Live integration tests for vitrin-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/vitrin-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use vitrin_core::{
    BrandConfig, BrandKind, CategoryListing, DiscoveredEndpoint, ScrapedProduct, ScrapedSize,
    StockStatus,
};
use vitrin_db::{
    complete_scrape_run, create_scrape_run, expire_pending_orders, fail_scrape_run,
    get_product_by_url, get_scrape_run, insert_endpoints, list_active_brands, list_files,
    list_pending_category_endpoints, list_scrape_runs, list_sizes, mark_category_endpoint_done,
    mark_endpoint_done, mark_product_failed, refresh_product, seed_catalog, select_detail_targets,
    select_refresh_targets, start_scrape_run, store_product, DbError, DetailSelection,
    ExpiryOutcome, RefreshFilter, StoreOptions, EXPIRY_LOCK_KEY,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PRODUCT_URL: &str = "https://www.decathlon.com.tr/p/erkek-kosu-ayakkabisi/_/R-p-333012";

/// Insert a minimal brand row and return its generated `id`.
async fn insert_test_brand(pool: &sqlx::PgPool, slug: &str, kind: BrandKind) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO brands (name, slug, kind, domain) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(format!("Test Brand {slug}"))
    .bind(slug)
    .bind(kind.as_str())
    .bind(format!("https://www.{slug}.com.tr"))
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_test_brand failed for slug '{slug}': {e}"))
}

async fn insert_test_category(pool: &sqlx::PgPool, slug: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO categories (name, slug) VALUES ($1, $1) RETURNING id",
    )
    .bind(slug)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_test_category failed for slug '{slug}': {e}"))
}

fn size(code: &str, status: StockStatus) -> ScrapedSize {
    ScrapedSize {
        code: code.to_string(),
        status,
    }
}

fn make_product() -> ScrapedProduct {
    ScrapedProduct {
        title: "Jogflow 500.1".to_string(),
        price: 1299,
        discount: 20,
        images: vec![
            "https://contents.mediadecathlon.com/p1.jpg".to_string(),
            "https://contents.mediadecathlon.com/p2.jpg".to_string(),
            "https://contents.mediadecathlon.com/p3.jpg".to_string(),
        ],
        sizes: vec![
            size("41", StockStatus::InStock),
            size("42", StockStatus::Low),
            size("43", StockStatus::OutOfStock),
        ],
        related_products: vec![
            "https://www.decathlon.com.tr/p/kiprun-ks500/_/R-p-324452".to_string(),
            "https://www.decathlon.com.tr/p/run500-corap/_/R-p-301911".to_string(),
        ],
    }
}

fn options(record_related: bool) -> StoreOptions {
    StoreOptions {
        default_stock: 10,
        record_related,
    }
}

fn endpoints(brand_id: i64, category_id: i64, prefix: &str, n: usize) -> Vec<DiscoveredEndpoint> {
    (0..n)
        .map(|i| DiscoveredEndpoint {
            url: format!("https://www.adidas.com.tr/tr/{prefix}-{i}/X{i}.html"),
            brand_id,
            category_id,
        })
        .collect()
}

async fn count(pool: &sqlx::PgPool, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("count query failed ({sql}): {e}"))
}

// ---------------------------------------------------------------------------
// Section 1: Scrape Run Lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn scrape_run_lifecycle_queued_to_succeeded(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "adidas", BrandKind::Adidas).await;
    let run = create_scrape_run(&pool, "details", Some(brand_id), "cli")
        .await
        .expect("create_scrape_run failed");

    assert_eq!(run.status, "queued");
    assert!(run.started_at.is_none());

    start_scrape_run(&pool, run.id)
        .await
        .expect("start_scrape_run failed");
    complete_scrape_run(&pool, run.id, 12, 3)
        .await
        .expect("complete_scrape_run failed");

    let fetched = get_scrape_run(&pool, run.id)
        .await
        .expect("get_scrape_run failed");
    assert_eq!(fetched.status, "succeeded");
    assert!(fetched.started_at.is_some());
    assert!(fetched.completed_at.is_some());
    assert_eq!(fetched.records_processed, 12);
    assert_eq!(fetched.records_failed, 3);
    assert_eq!(fetched.brand_id, Some(brand_id));
}

#[sqlx::test(migrations = "../../migrations")]
async fn scrape_run_lifecycle_queued_to_failed(pool: sqlx::PgPool) {
    let run = create_scrape_run(&pool, "listing", None, "cli")
        .await
        .expect("create_scrape_run failed");
    start_scrape_run(&pool, run.id)
        .await
        .expect("start_scrape_run failed");
    fail_scrape_run(&pool, run.id, "gateway credentials rejected")
        .await
        .expect("fail_scrape_run failed");

    let fetched = get_scrape_run(&pool, run.id)
        .await
        .expect("get_scrape_run failed");
    assert_eq!(fetched.status, "failed");
    assert_eq!(
        fetched.error_message.as_deref(),
        Some("gateway credentials rejected")
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn scrape_run_cannot_complete_before_start(pool: sqlx::PgPool) {
    let run = create_scrape_run(&pool, "refresh", None, "cli")
        .await
        .expect("create_scrape_run failed");

    let err = complete_scrape_run(&pool, run.id, 0, 0).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidRunTransition {
            expected_status: "running",
            ..
        }
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_scrape_runs_is_newest_first(pool: sqlx::PgPool) {
    let first = create_scrape_run(&pool, "listing", None, "cli").await.unwrap();
    let second = create_scrape_run(&pool, "details", None, "scheduler")
        .await
        .unwrap();

    let runs = list_scrape_runs(&pool, 10).await.unwrap();
    let ids: Vec<i64> = runs.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn get_scrape_run_missing_is_not_found(pool: sqlx::PgPool) {
    let err = get_scrape_run(&pool, 999_999).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Section 2: Seeding
// ---------------------------------------------------------------------------

fn catalog() -> Vec<BrandConfig> {
    vec![
        BrandConfig {
            name: "Adidas".to_string(),
            kind: BrandKind::Adidas,
            domain: "https://www.adidas.com.tr".to_string(),
            categories: vec![CategoryListing {
                category: "Running Shoes".to_string(),
                url: "https://www.adidas.com.tr/tr/erkek-kosu-ayakkabilari".to_string(),
            }],
        },
        BrandConfig {
            name: "Decathlon".to_string(),
            kind: BrandKind::Decathlon,
            domain: "https://www.decathlon.com.tr".to_string(),
            categories: vec![
                CategoryListing {
                    category: "Running Shoes".to_string(),
                    url: "https://www.decathlon.com.tr/erkek-kosu-ayakkabilari".to_string(),
                },
                CategoryListing {
                    category: "Hiking Boots".to_string(),
                    url: "https://www.decathlon.com.tr/erkek-trekking-botlari".to_string(),
                },
            ],
        },
    ]
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_catalog_is_idempotent(pool: sqlx::PgPool) {
    let first = seed_catalog(&pool, &catalog()).await.expect("seed failed");
    assert_eq!(first.brands, 2);
    assert_eq!(first.categories, 2);
    assert_eq!(first.category_endpoints, 3);

    seed_catalog(&pool, &catalog()).await.expect("reseed failed");

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM brands").await, 2);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM categories").await, 2);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM category_endpoints").await, 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn reseeding_keeps_category_endpoint_progress(pool: sqlx::PgPool) {
    seed_catalog(&pool, &catalog()).await.expect("seed failed");
    let brands = list_active_brands(&pool, Some(BrandKind::Decathlon))
        .await
        .expect("list_active_brands failed");
    assert_eq!(brands.len(), 1);
    let decathlon = &brands[0];

    let pending = list_pending_category_endpoints(&pool, decathlon.id)
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
    mark_category_endpoint_done(&pool, pending[0].id)
        .await
        .unwrap();

    seed_catalog(&pool, &catalog()).await.expect("reseed failed");

    let pending = list_pending_category_endpoints(&pool, decathlon.id)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_active_brands_without_filter_returns_all(pool: sqlx::PgPool) {
    seed_catalog(&pool, &catalog()).await.expect("seed failed");
    let brands = list_active_brands(&pool, None).await.unwrap();
    let kinds: Vec<BrandKind> = brands.iter().map(|b| b.brand_kind().unwrap()).collect();
    assert_eq!(kinds, vec![BrandKind::Adidas, BrandKind::Decathlon]);
}

// ---------------------------------------------------------------------------
// Section 3: Catalog Writer
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn store_product_twice_leaves_one_product_and_no_duplicate_children(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "decathlon", BrandKind::Decathlon).await;
    let category_id = insert_test_category(&pool, "running-shoes").await;
    let product = make_product();

    let first = store_product(&pool, brand_id, category_id, PRODUCT_URL, &product, options(false))
        .await
        .expect("first store_product failed");
    let second = store_product(&pool, brand_id, category_id, PRODUCT_URL, &product, options(false))
        .await
        .expect("second store_product failed");

    assert_eq!(first.product_id, second.product_id);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM products").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM sizes").await, 3);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM files").await, 3);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM category_product").await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn store_product_writes_stock_mapping_and_priorities(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "decathlon", BrandKind::Decathlon).await;
    let category_id = insert_test_category(&pool, "running-shoes").await;

    let stored = store_product(
        &pool,
        brand_id,
        category_id,
        PRODUCT_URL,
        &make_product(),
        options(false),
    )
    .await
    .expect("store_product failed");

    let row = get_product_by_url(&pool, PRODUCT_URL)
        .await
        .unwrap()
        .expect("product should exist");
    assert_eq!(row.title.as_deref(), Some("Jogflow 500.1"));
    assert_eq!(row.price, 1299);
    assert_eq!(row.discount, 20);
    assert_eq!(row.stock, 15);
    assert!(!row.is_failed);
    assert_eq!(
        row.image.as_deref(),
        Some("https://contents.mediadecathlon.com/p1.jpg")
    );
    assert_eq!(row.related_products.as_array().map(Vec::len), Some(2));

    let sizes = list_sizes(&pool, stored.product_id).await.unwrap();
    let by_code: Vec<(&str, i32, i32)> = sizes
        .iter()
        .map(|s| (s.code.as_str(), s.stock, s.priority))
        .collect();
    assert_eq!(by_code, vec![("41", 10, 0), ("42", 5, 1), ("43", 0, 2)]);

    let files = list_files(&pool, stored.product_id).await.unwrap();
    let priorities: Vec<(&str, i32)> = files
        .iter()
        .map(|f| (f.path.as_str(), f.priority))
        .collect();
    assert_eq!(
        priorities,
        vec![
            ("https://contents.mediadecathlon.com/p1.jpg", 3),
            ("https://contents.mediadecathlon.com/p2.jpg", 2),
            ("https://contents.mediadecathlon.com/p3.jpg", 1),
        ]
    );
    assert!(files.iter().all(|f| f.file_type == "image"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn store_product_adds_category_links_without_detaching(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "decathlon", BrandKind::Decathlon).await;
    let running = insert_test_category(&pool, "running-shoes").await;
    let trail = insert_test_category(&pool, "trail").await;
    let product = make_product();

    store_product(&pool, brand_id, running, PRODUCT_URL, &product, options(false))
        .await
        .unwrap();
    store_product(&pool, brand_id, trail, PRODUCT_URL, &product, options(false))
        .await
        .unwrap();

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM category_product").await, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn store_product_queues_related_endpoints_once(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "decathlon", BrandKind::Decathlon).await;
    let category_id = insert_test_category(&pool, "running-shoes").await;
    let product = make_product();

    let first = store_product(&pool, brand_id, category_id, PRODUCT_URL, &product, options(true))
        .await
        .unwrap();
    let second = store_product(&pool, brand_id, category_id, PRODUCT_URL, &product, options(true))
        .await
        .unwrap();

    assert_eq!(first.new_endpoints, 2);
    assert_eq!(second.new_endpoints, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM endpoints").await, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn store_product_without_related_recording_queues_nothing(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "adidas", BrandKind::Adidas).await;
    let category_id = insert_test_category(&pool, "running-shoes").await;

    let stored = store_product(
        &pool,
        brand_id,
        category_id,
        PRODUCT_URL,
        &make_product(),
        options(false),
    )
    .await
    .unwrap();

    assert_eq!(stored.new_endpoints, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM endpoints").await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn mark_product_failed_creates_untitled_row_and_store_clears_flag(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "decathlon", BrandKind::Decathlon).await;
    let category_id = insert_test_category(&pool, "running-shoes").await;

    let failed_id = mark_product_failed(&pool, brand_id, PRODUCT_URL)
        .await
        .expect("mark_product_failed failed");
    let row = get_product_by_url(&pool, PRODUCT_URL).await.unwrap().unwrap();
    assert!(row.is_failed);
    assert!(row.title.is_none());

    let stored = store_product(
        &pool,
        brand_id,
        category_id,
        PRODUCT_URL,
        &make_product(),
        options(false),
    )
    .await
    .unwrap();
    assert_eq!(stored.product_id, failed_id);

    let row = get_product_by_url(&pool, PRODUCT_URL).await.unwrap().unwrap();
    assert!(!row.is_failed);
}

#[sqlx::test(migrations = "../../migrations")]
async fn refresh_product_updates_price_and_zeroes_vanished_sizes(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "decathlon", BrandKind::Decathlon).await;
    let category_id = insert_test_category(&pool, "running-shoes").await;
    let stored = store_product(
        &pool,
        brand_id,
        category_id,
        PRODUCT_URL,
        &make_product(),
        options(false),
    )
    .await
    .unwrap();

    let mut rescraped = make_product();
    rescraped.price = 999;
    rescraped.discount = 35;
    rescraped.sizes = vec![
        size("41", StockStatus::Low),
        size("43", StockStatus::InStock),
    ];

    let refreshed = refresh_product(&pool, stored.product_id, &rescraped, 10)
        .await
        .expect("refresh_product failed");
    assert_eq!(refreshed.sizes, 2);
    assert_eq!(refreshed.zeroed_sizes, 1);

    let row = get_product_by_url(&pool, PRODUCT_URL).await.unwrap().unwrap();
    assert_eq!(row.price, 999);
    assert_eq!(row.discount, 35);
    assert_eq!(row.stock, 15);

    let sizes = list_sizes(&pool, stored.product_id).await.unwrap();
    let stock: Vec<(&str, i32)> = sizes.iter().map(|s| (s.code.as_str(), s.stock)).collect();
    assert_eq!(stock, vec![("41", 5), ("42", 0), ("43", 10)]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn refresh_product_missing_id_is_not_found(pool: sqlx::PgPool) {
    let err = refresh_product(&pool, 424_242, &make_product(), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Section 4: Crawl Queues
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn listing_pages_insert_108_endpoints_minus_existing(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "adidas", BrandKind::Adidas).await;
    let category_id = insert_test_category(&pool, "running-shoes").await;
    let all = endpoints(brand_id, category_id, "ultraboost", 108);

    // Three of the products were discovered by an earlier crawl.
    insert_endpoints(&pool, &all[10..13]).await.unwrap();

    let mut inserted = 0;
    for page in [&all[0..48], &all[48..96], &all[96..108]] {
        inserted += insert_endpoints(&pool, page).await.unwrap();
    }

    assert_eq!(inserted, 105);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM endpoints").await, 108);
}

#[sqlx::test(migrations = "../../migrations")]
async fn insert_endpoints_tolerates_duplicates_within_a_batch(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "adidas", BrandKind::Adidas).await;
    let category_id = insert_test_category(&pool, "running-shoes").await;
    let mut batch = endpoints(brand_id, category_id, "samba", 2);
    batch.push(batch[0].clone());

    assert_eq!(insert_endpoints(&pool, &batch).await.unwrap(), 2);
    assert_eq!(insert_endpoints(&pool, &[]).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn detail_targets_follow_selection(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "adidas", BrandKind::Adidas).await;
    let category_id = insert_test_category(&pool, "running-shoes").await;
    let queued = endpoints(brand_id, category_id, "gazelle", 4);
    insert_endpoints(&pool, &queued).await.unwrap();

    let rows = select_detail_targets(&pool, brand_id, DetailSelection::All, None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);

    // 0: crawled into a complete product, 1: crawled into a failed product,
    // 2: crawled into a product without sizes, 3: still pending.
    let mut complete = make_product();
    complete.related_products.clear();
    store_product(&pool, brand_id, category_id, &rows[0].url, &complete, options(false))
        .await
        .unwrap();
    mark_endpoint_done(&pool, rows[0].id).await.unwrap();

    mark_product_failed(&pool, brand_id, &rows[1].url).await.unwrap();
    mark_endpoint_done(&pool, rows[1].id).await.unwrap();

    let mut sizeless = complete.clone();
    sizeless.sizes.clear();
    store_product(&pool, brand_id, category_id, &rows[2].url, &sizeless, options(false))
        .await
        .unwrap();
    mark_endpoint_done(&pool, rows[2].id).await.unwrap();

    let ids = |rows: Vec<vitrin_db::EndpointRow>| rows.into_iter().map(|r| r.id).collect::<Vec<_>>();

    let pending = select_detail_targets(&pool, brand_id, DetailSelection::Pending, None)
        .await
        .unwrap();
    assert_eq!(ids(pending), vec![rows[3].id, rows[2].id]);

    let failed = select_detail_targets(&pool, brand_id, DetailSelection::Failed, None)
        .await
        .unwrap();
    assert_eq!(ids(failed), vec![rows[1].id]);

    let limited = select_detail_targets(&pool, brand_id, DetailSelection::All, Some(2))
        .await
        .unwrap();
    assert_eq!(ids(limited), vec![rows[0].id, rows[1].id]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn pending_detail_targets_reach_new_endpoints_past_sizeless_products(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "adidas", BrandKind::Adidas).await;
    let category_id = insert_test_category(&pool, "sneakers").await;
    insert_endpoints(&pool, &endpoints(brand_id, category_id, "samba", 3))
        .await
        .unwrap();
    let rows = select_detail_targets(&pool, brand_id, DetailSelection::All, None)
        .await
        .unwrap();

    // The first two endpoints hold one-size products whose size list came
    // back empty; they stay eligible for a revisit.
    let mut sizeless = make_product();
    sizeless.sizes.clear();
    sizeless.related_products.clear();
    for row in &rows[..2] {
        store_product(&pool, brand_id, category_id, &row.url, &sizeless, options(false))
            .await
            .unwrap();
        mark_endpoint_done(&pool, row.id).await.unwrap();
    }

    let picked = select_detail_targets(&pool, brand_id, DetailSelection::Pending, Some(2))
        .await
        .unwrap();
    let picked: Vec<i64> = picked.into_iter().map(|r| r.id).collect();
    assert_eq!(picked, vec![rows[2].id, rows[0].id]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn refresh_targets_respect_filters(pool: sqlx::PgPool) {
    let brand_id = insert_test_brand(&pool, "decathlon", BrandKind::Decathlon).await;
    let category_id = insert_test_category(&pool, "running-shoes").await;

    let mut full_price = make_product();
    full_price.discount = 0;
    store_product(&pool, brand_id, category_id, "https://d.test/p/a", &full_price, options(false))
        .await
        .unwrap();
    store_product(&pool, brand_id, category_id, "https://d.test/p/b", &make_product(), options(false))
        .await
        .unwrap();
    mark_product_failed(&pool, brand_id, "https://d.test/p/c")
        .await
        .unwrap();

    let urls = |rows: Vec<vitrin_db::RefreshTarget>| rows.into_iter().map(|r| r.url).collect::<Vec<_>>();

    let completed = select_refresh_targets(&pool, brand_id, RefreshFilter::default())
        .await
        .unwrap();
    assert_eq!(urls(completed), vec!["https://d.test/p/a", "https://d.test/p/b"]);

    let discounted = select_refresh_targets(
        &pool,
        brand_id,
        RefreshFilter {
            discounted_only: true,
            ..RefreshFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(urls(discounted), vec!["https://d.test/p/b"]);

    let failed = select_refresh_targets(
        &pool,
        brand_id,
        RefreshFilter {
            failed_only: true,
            ..RefreshFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(urls(failed), vec!["https://d.test/p/c"]);

    let limited = select_refresh_targets(
        &pool,
        brand_id,
        RefreshFilter {
            limit: Some(1),
            ..RefreshFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(urls(limited), vec!["https://d.test/p/a"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn marking_unknown_endpoint_is_not_found(pool: sqlx::PgPool) {
    assert!(matches!(
        mark_endpoint_done(&pool, 31_337).await,
        Err(DbError::NotFound)
    ));
    assert!(matches!(
        mark_category_endpoint_done(&pool, 31_337).await,
        Err(DbError::NotFound)
    ));
}

// ---------------------------------------------------------------------------
// Section 5: Order Expiry
// ---------------------------------------------------------------------------

async fn insert_order(pool: &sqlx::PgPool, status: &str, age_hours: i32) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO orders (status, total, created_at) \
         VALUES ($1, 1499, NOW() - make_interval(hours => $2)) RETURNING id",
    )
    .bind(status)
    .bind(age_hours)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_order failed: {e}"))
}

async fn order_status(pool: &sqlx::PgPool, id: i64) -> String {
    sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../migrations")]
async fn expire_pending_orders_only_touches_stale_pending(pool: sqlx::PgPool) {
    let stale = insert_order(&pool, "pending", 30).await;
    let fresh = insert_order(&pool, "pending", 1).await;
    let processing = insert_order(&pool, "processing", 48).await;

    let outcome = expire_pending_orders(&pool, 24).await.expect("expiry failed");
    assert_eq!(outcome, ExpiryOutcome::Expired(1));

    assert_eq!(order_status(&pool, stale).await, "expired");
    assert_eq!(order_status(&pool, fresh).await, "pending");
    assert_eq!(order_status(&pool, processing).await, "processing");

    let again = expire_pending_orders(&pool, 24).await.unwrap();
    assert_eq!(again, ExpiryOutcome::Expired(0));
}

#[sqlx::test(migrations = "../../migrations")]
async fn expire_pending_orders_skips_while_another_run_holds_lock(pool: sqlx::PgPool) {
    let stale = insert_order(&pool, "pending", 30).await;

    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(EXPIRY_LOCK_KEY)
        .execute(&mut *holder)
        .await
        .unwrap();

    let outcome = expire_pending_orders(&pool, 24).await.unwrap();
    assert_eq!(outcome, ExpiryOutcome::Skipped);
    assert_eq!(order_status(&pool, stale).await, "pending");

    holder.rollback().await.unwrap();

    let outcome = expire_pending_orders(&pool, 24).await.unwrap();
    assert_eq!(outcome, ExpiryOutcome::Expired(1));
}
