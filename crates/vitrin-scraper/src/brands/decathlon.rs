//! Decathlon Türkiye storefront.
//!
//! Listings page with `?from=<offset>` in steps of 40. The size picker is a
//! `<select>` whose options carry `data-size` and `data-stock-status`, and
//! product pages link to recommended products that are queued as new
//! endpoints.

use vitrin_core::{BrandKind, ScrapedProduct, ScrapedSize, StockStatus};

use super::{image_urls, invalid, product_links, BrandExtractor, LINKS_FIELD};
use crate::error::ScraperError;
use crate::parse::{
    attribute, canonical_url, derive_discount, extract_origin, has_class_containing,
    parse_discount_percent, parse_locale_price, strip_tags, Attr,
};
use crate::recipe::ParsingRecipe;
use crate::types::ParsedContent;

pub struct Decathlon;

impl BrandExtractor for Decathlon {
    fn kind(&self) -> BrandKind {
        BrandKind::Decathlon
    }

    fn page_size(&self) -> usize {
        40
    }

    fn offset_param(&self) -> &'static str {
        "from"
    }

    fn listing_recipe(&self) -> ParsingRecipe {
        ParsingRecipe::new().xpath(
            LINKS_FIELD,
            "//div[contains(@class,'product-list')]//a[contains(@class,'product-card-link')]/@href",
        )
    }

    fn product_recipe(&self) -> ParsingRecipe {
        ParsingRecipe::new()
            .xpath_one("title", "//h1[contains(@class,'product-name')]//text()")
            .xpath_one(
                "price",
                "//div[contains(@class,'product-price')]//span[contains(@class,'vtmn-price') and not(contains(@class,'strikethrough'))]",
            )
            .xpath_one(
                "original_price",
                "//div[contains(@class,'product-price')]//span[contains(@class,'strikethrough')]",
            )
            .xpath_one("discount", "//span[contains(@class,'price-discount')]//text()")
            .xpath("images", "//section[contains(@class,'product-gallery')]//img/@src")
            .xpath("sizes", "//select[@id='select-size']/option")
            .xpath(
                "related",
                "//section[contains(@class,'recommendations')]//a[contains(@class,'product-card-link')]/@href",
            )
    }

    fn records_related_endpoints(&self) -> bool {
        true
    }

    fn is_product_url(&self, url: &str) -> bool {
        url.contains("/p/")
    }

    fn clean_product_data(
        &self,
        content: &ParsedContent,
        page_url: &str,
    ) -> Result<ScrapedProduct, ScraperError> {
        let title = content
            .text("title")
            .map(|t| strip_tags(&t))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| invalid(page_url, "missing title"))?;

        let price = content
            .text("price")
            .and_then(|p| parse_locale_price(&p))
            .ok_or_else(|| invalid(page_url, "missing or unparseable price"))?;

        let discount = content
            .text("discount")
            .and_then(|d| parse_discount_percent(&d))
            .or_else(|| {
                content
                    .text("original_price")
                    .and_then(|o| parse_locale_price(&o))
                    .map(|original| derive_discount(original, price))
            })
            .unwrap_or(0);

        let domain = extract_origin(page_url);
        let sizes = content
            .list("sizes")
            .iter()
            .filter_map(|fragment| size_from_option(fragment))
            .collect();

        let own_url = canonical_url(page_url);
        let related_products = product_links(self, &content.list("related"), &domain)
            .into_iter()
            .filter(|url| *url != own_url)
            .collect();

        Ok(ScrapedProduct {
            title,
            price,
            discount,
            images: image_urls(content, "images", &domain),
            sizes,
            related_products,
        })
    }
}

/// `<option data-size="42" data-stock-status="low">42 - Son 2 ürün</option>`
///
/// The placeholder option (`Beden seçin`, empty `value`) is skipped.
fn size_from_option(fragment: &str) -> Option<ScrapedSize> {
    if attribute(fragment, Attr::Value).is_none()
        && attribute(fragment, Attr::DataSize).is_none()
    {
        return None;
    }

    let code = attribute(fragment, Attr::DataSize).or_else(|| {
        let text = strip_tags(fragment);
        text.split(" - ")
            .next()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
    })?;

    let status = match attribute(fragment, Attr::DataStockStatus) {
        Some(word) => StockStatus::from_vocabulary(&word),
        None if has_class_containing(fragment, "out-of-stock") => StockStatus::OutOfStock,
        None => StockStatus::InStock,
    };

    Some(ScrapedSize { code, status })
}
