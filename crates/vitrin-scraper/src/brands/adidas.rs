//! adidas Türkiye storefront.
//!
//! Listings page with `?start=<offset>` in steps of 48. Product pages expose
//! the size selector as a row of buttons whose classes carry availability.

use vitrin_core::{BrandKind, ScrapedProduct, ScrapedSize, StockStatus};

use super::{image_urls, invalid, BrandExtractor, LINKS_FIELD};
use crate::error::ScraperError;
use crate::parse::{
    attribute, derive_discount, extract_origin, has_class_containing, parse_discount_percent,
    parse_locale_price, strip_tags, Attr,
};
use crate::recipe::ParsingRecipe;
use crate::types::ParsedContent;

pub struct Adidas;

impl BrandExtractor for Adidas {
    fn kind(&self) -> BrandKind {
        BrandKind::Adidas
    }

    fn page_size(&self) -> usize {
        48
    }

    fn offset_param(&self) -> &'static str {
        "start"
    }

    fn listing_recipe(&self) -> ParsingRecipe {
        ParsingRecipe::new().xpath(
            LINKS_FIELD,
            "//div[@data-auto-id='glass-product-card']//a[@data-auto-id='glass-hockeycard-link']/@href",
        )
    }

    fn product_recipe(&self) -> ParsingRecipe {
        ParsingRecipe::new()
            .xpath_one("title", "//h1[@data-auto-id='product-title']//text()")
            .xpath_one(
                "price",
                "//div[@data-auto-id='gl-price-item']//div[contains(@class,'gl-price') and not(contains(@class,'crossed'))]",
            )
            .xpath_one(
                "original_price",
                "//div[@data-auto-id='gl-price-item']//div[contains(@class,'gl-price-item--crossed')]",
            )
            .xpath_one("discount", "//div[contains(@class,'sale-percentage')]//text()")
            .xpath("images", "//section[@data-auto-id='image-viewer']//img/@src")
            .xpath("sizes", "//div[@data-auto-id='size-selector']//button")
    }

    fn is_product_url(&self, url: &str) -> bool {
        url.ends_with(".html")
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
            .filter_map(|fragment| size_from_button(fragment))
            .collect();

        Ok(ScrapedProduct {
            title,
            price,
            discount,
            images: image_urls(content, "images", &domain),
            sizes,
            related_products: Vec::new(),
        })
    }
}

/// `<button class="size--unavailable" disabled><span>42</span></button>`
fn size_from_button(fragment: &str) -> Option<ScrapedSize> {
    let code = strip_tags(fragment);
    if code.is_empty() {
        return None;
    }

    let opening_tag = fragment.split('>').next().unwrap_or_default();
    let disabled = opening_tag
        .split_whitespace()
        .any(|token| token == "disabled" || token.starts_with("disabled="))
        || attribute(fragment, Attr::AriaDisabled).as_deref() == Some("true");

    let status = if disabled
        || has_class_containing(fragment, "unavailable")
        || has_class_containing(fragment, "out-of-stock")
    {
        StockStatus::OutOfStock
    } else if has_class_containing(fragment, "low-stock") {
        StockStatus::Low
    } else {
        StockStatus::InStock
    };

    Some(ScrapedSize { code, status })
}
