//! Seed catalog: brands, their storefront kind, and category listing URLs.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::products::BrandKind;
use crate::ConfigError;

/// A category listing page on a brand's storefront where crawling starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryListing {
    /// Category display name, shared across brands (e.g. `"Running Shoes"`).
    pub category: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    pub name: String,
    pub kind: BrandKind,
    /// Storefront origin, e.g. `"https://www.adidas.com.tr"`.
    pub domain: String,
    #[serde(default)]
    pub categories: Vec<CategoryListing>,
}

impl BrandConfig {
    /// Generate a URL-safe slug from the brand name.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub brands: Vec<BrandConfig>,
}

/// Lowercase ASCII slug; spaces become dashes, other characters are dropped.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Load and validate the seed catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let catalog: CatalogFile =
        serde_yaml::from_str(&content).map_err(ConfigError::CatalogFileParse)?;

    validate_catalog(&catalog)?;

    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();
    let mut seen_urls = HashSet::new();

    for brand in &catalog.brands {
        if brand.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "brand name must be non-empty".to_string(),
            ));
        }

        let slug = brand.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand slug: '{}' (from brand '{}')",
                slug, brand.name
            )));
        }

        if !is_http_url(&brand.domain) {
            return Err(ConfigError::Validation(format!(
                "brand '{}' has invalid domain '{}'; expected an http(s) URL",
                brand.name, brand.domain
            )));
        }

        for listing in &brand.categories {
            if slugify(&listing.category).is_empty() {
                return Err(ConfigError::Validation(format!(
                    "brand '{}' has a category with an empty name",
                    brand.name
                )));
            }
            if !is_http_url(&listing.url) {
                return Err(ConfigError::Validation(format!(
                    "brand '{}' category '{}' has invalid url '{}'",
                    brand.name, listing.category, listing.url
                )));
            }
            if !seen_urls.insert(listing.url.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate category url: '{}'",
                    listing.url
                )));
            }
        }
    }

    Ok(())
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
