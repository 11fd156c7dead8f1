//! Brand-specific extraction strategies.
//!
//! Each storefront gets one [`BrandExtractor`]: it knows how the brand pages
//! its category listings, which fields to ask the gateway for, and how to turn
//! the returned fragments into [`ScrapedProduct`]s. Drivers stay brand-agnostic
//! and look the strategy up with [`extractor_for`].

mod adidas;
mod decathlon;

use vitrin_core::{BrandKind, DiscoveredEndpoint, ScrapedProduct};

use crate::error::ScraperError;
use crate::parse::{absolutize_url, canonical_url, dedupe_preserving_order};
use crate::recipe::ParsingRecipe;
use crate::types::ParsedContent;

pub use adidas::Adidas;
pub use decathlon::Decathlon;

/// Field name every listing recipe uses for product links.
pub const LINKS_FIELD: &str = "links";

pub trait BrandExtractor: Send + Sync {
    fn kind(&self) -> BrandKind;

    /// Number of products a full listing page carries. A page with fewer
    /// items is the last one.
    fn page_size(&self) -> usize;

    /// Query parameter that carries the item offset on listing pages.
    fn offset_param(&self) -> &'static str;

    /// Listing URL for the page starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `category_url` does not parse.
    fn listing_page_url(&self, category_url: &str, offset: usize) -> Result<String, ScraperError> {
        with_query_param(category_url, self.offset_param(), &offset.to_string())
    }

    fn listing_recipe(&self) -> ParsingRecipe;

    fn product_recipe(&self) -> ParsingRecipe;

    /// Whether related-product links found on a detail page should be queued
    /// as new endpoints.
    fn records_related_endpoints(&self) -> bool {
        false
    }

    /// `true` if an absolute, canonical URL points at a product detail page.
    fn is_product_url(&self, url: &str) -> bool;

    /// Product endpoints linked from one listing page, absolute, without
    /// query strings and in page order.
    fn clean_product_list(
        &self,
        content: &ParsedContent,
        brand_id: i64,
        category_id: i64,
        domain: &str,
    ) -> Vec<DiscoveredEndpoint> {
        product_links(self, &content.list(LINKS_FIELD), domain)
            .into_iter()
            .map(|url| DiscoveredEndpoint {
                url,
                brand_id,
                category_id,
            })
            .collect()
    }

    /// Builds a product from a detail page.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidData`] when the page lacks a title or a
    /// parseable price. A partially populated product is never returned.
    fn clean_product_data(
        &self,
        content: &ParsedContent,
        page_url: &str,
    ) -> Result<ScrapedProduct, ScraperError>;
}

/// Strategy for `kind`.
#[must_use]
pub fn extractor_for(kind: BrandKind) -> &'static dyn BrandExtractor {
    match kind {
        BrandKind::Adidas => &Adidas,
        BrandKind::Decathlon => &Decathlon,
    }
}

/// Absolutizes, canonicalizes, filters and dedupes raw hrefs.
pub(crate) fn product_links<B>(brand: &B, hrefs: &[String], domain: &str) -> Vec<String>
where
    B: BrandExtractor + ?Sized,
{
    dedupe_preserving_order(
        hrefs
            .iter()
            .filter_map(|href| absolutize_url(domain, href))
            .map(|url| canonical_url(&url))
            .filter(|url| brand.is_product_url(url)),
    )
}

/// Absolutized, deduped image URLs.
pub(crate) fn image_urls(content: &ParsedContent, field: &str, domain: &str) -> Vec<String> {
    dedupe_preserving_order(
        content
            .list(field)
            .iter()
            .filter_map(|src| absolutize_url(domain, src)),
    )
}

pub(crate) fn invalid(page_url: &str, reason: &str) -> ScraperError {
    ScraperError::InvalidData {
        url: page_url.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Sets `name=value` on `url`, replacing any existing value for `name`.
fn with_query_param(url: &str, name: &str, value: &str) -> Result<String, ScraperError> {
    let mut parsed = reqwest::Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut pairs = parsed.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(name, value);
    }

    Ok(parsed.to_string())
}

#[cfg(test)]
#[path = "brands_test.rs"]
mod tests;
