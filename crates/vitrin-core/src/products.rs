use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Stock assigned to a size whose storefront marks it as running low.
pub const LOW_STOCK: i32 = 5;

/// The storefronts the pipeline knows how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandKind {
    Adidas,
    Decathlon,
}

impl BrandKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BrandKind::Adidas => "adidas",
            BrandKind::Decathlon => "decathlon",
        }
    }
}

impl std::fmt::Display for BrandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrandKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adidas" => Ok(BrandKind::Adidas),
            "decathlon" => Ok(BrandKind::Decathlon),
            other => Err(CoreError::UnknownBrand(other.to_string())),
        }
    }
}

/// Availability of a single size as reported by a storefront.
///
/// Storefronts describe availability with a small vocabulary
/// (`instock`, `low`, `outofstock`, `notfound`). Anything else is kept as
/// [`StockStatus::Unknown`] so it can still be logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    InStock,
    Low,
    OutOfStock,
    NotFound,
    Unknown(String),
}

impl StockStatus {
    /// Maps a storefront availability word onto a [`StockStatus`].
    ///
    /// Case, whitespace, dashes and underscores are ignored, so
    /// `"Out-Of-Stock"`, `"out_of_stock"` and `"outofstock"` are equivalent.
    #[must_use]
    pub fn from_vocabulary(raw: &str) -> Self {
        let key: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "instock" | "available" => StockStatus::InStock,
            "low" | "lowstock" => StockStatus::Low,
            "outofstock" | "soldout" | "unavailable" => StockStatus::OutOfStock,
            "notfound" => StockStatus::NotFound,
            _ => StockStatus::Unknown(raw.trim().to_string()),
        }
    }

    /// Numeric stock derived from the status.
    ///
    /// `Low` → [`LOW_STOCK`], `OutOfStock`/`NotFound` → 0, `InStock` and
    /// unknown words → `default_stock`.
    #[must_use]
    pub fn stock(&self, default_stock: i32) -> i32 {
        match self {
            StockStatus::Low => LOW_STOCK,
            StockStatus::OutOfStock | StockStatus::NotFound => 0,
            StockStatus::InStock | StockStatus::Unknown(_) => default_stock,
        }
    }
}

/// One size option on a product page, e.g. shoe size `"42"` or `"M"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedSize {
    pub code: String,
    pub status: StockStatus,
}

/// A product page after brand-specific extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedProduct {
    pub title: String,
    /// Sale price in whole currency units; decimals are truncated.
    pub price: i64,
    /// Discount percentage, `0..=100`.
    pub discount: i32,
    /// Absolute image URLs in page order.
    pub images: Vec<String>,
    pub sizes: Vec<ScrapedSize>,
    /// Absolute URLs of products the page recommends.
    pub related_products: Vec<String>,
}

impl ScrapedProduct {
    /// Total stock across sizes, or `default_stock` for one-size products.
    #[must_use]
    pub fn total_stock(&self, default_stock: i32) -> i32 {
        if self.sizes.is_empty() {
            return default_stock;
        }
        self.sizes
            .iter()
            .map(|s| s.status.stock(default_stock))
            .fold(0i32, i32::saturating_add)
    }

    /// First image in page order, used as the product's primary image.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// A product-detail URL found on a listing page or as a related product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscoveredEndpoint {
    pub url: String,
    pub brand_id: i64,
    pub category_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(code: &str, status: StockStatus) -> ScrapedSize {
        ScrapedSize {
            code: code.to_string(),
            status,
        }
    }

    fn product(sizes: Vec<ScrapedSize>) -> ScrapedProduct {
        ScrapedProduct {
            title: "Ultraboost 22".to_string(),
            price: 1499,
            discount: 0,
            images: vec![
                "https://www.adidas.com.tr/a.jpg".to_string(),
                "https://www.adidas.com.tr/b.jpg".to_string(),
            ],
            sizes,
            related_products: vec![],
        }
    }

    #[test]
    fn stock_mapping_is_deterministic() {
        assert_eq!(StockStatus::from_vocabulary("low").stock(10), 5);
        assert_eq!(StockStatus::from_vocabulary("outofstock").stock(10), 0);
        assert_eq!(StockStatus::from_vocabulary("notfound").stock(10), 0);
        assert_eq!(StockStatus::from_vocabulary("instock").stock(10), 10);
        assert_eq!(StockStatus::from_vocabulary("mystery").stock(10), 10);
    }

    #[test]
    fn vocabulary_ignores_case_and_separators() {
        assert_eq!(
            StockStatus::from_vocabulary("Out-Of-Stock"),
            StockStatus::OutOfStock
        );
        assert_eq!(
            StockStatus::from_vocabulary(" out_of_stock "),
            StockStatus::OutOfStock
        );
        assert_eq!(StockStatus::from_vocabulary("LOW_STOCK"), StockStatus::Low);
        assert_eq!(StockStatus::from_vocabulary("In Stock"), StockStatus::InStock);
    }

    #[test]
    fn unknown_vocabulary_keeps_raw_word() {
        assert_eq!(
            StockStatus::from_vocabulary(" backorder "),
            StockStatus::Unknown("backorder".to_string())
        );
    }

    #[test]
    fn total_stock_sums_sizes() {
        let p = product(vec![
            size("40", StockStatus::InStock),
            size("41", StockStatus::Low),
            size("42", StockStatus::OutOfStock),
        ]);
        assert_eq!(p.total_stock(10), 15);
    }

    #[test]
    fn total_stock_without_sizes_uses_default() {
        assert_eq!(product(vec![]).total_stock(7), 7);
    }

    #[test]
    fn primary_image_is_first() {
        assert_eq!(
            product(vec![]).primary_image(),
            Some("https://www.adidas.com.tr/a.jpg")
        );
    }

    #[test]
    fn brand_kind_round_trips_through_str() {
        assert_eq!("Adidas".parse::<BrandKind>().unwrap(), BrandKind::Adidas);
        assert_eq!(" decathlon".parse::<BrandKind>().unwrap(), BrandKind::Decathlon);
        assert_eq!(BrandKind::Decathlon.to_string(), "decathlon");
        assert!(matches!(
            "nike".parse::<BrandKind>(),
            Err(CoreError::UnknownBrand(ref s)) if s == "nike"
        ));
    }

    #[test]
    fn brand_kind_serializes_lowercase() {
        let json = serde_json::to_string(&BrandKind::Adidas).unwrap();
        assert_eq!(json, "\"adidas\"");
    }
}
