//! Text helpers shared by the brand extractors.
//!
//! Gateway fields arrive as HTML fragments or raw text nodes. These helpers
//! turn them into plain text, whole-unit prices, discount percentages and
//! absolute URLs. None of it knows about a particular storefront.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid tags regex"));

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d.,]*").expect("valid price regex"));

static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%\s*(\d{1,3})|(\d{1,3})(?:[.,]\d+)?\s*%").expect("valid percent regex")
});

/// Removes tags, decodes the common entities and collapses whitespace.
///
/// `"<span>1.499,00&nbsp;TL</span>"` → `"1.499,00 TL"`.
#[must_use]
pub fn strip_tags(fragment: &str) -> String {
    let without_tags = TAG_RE.replace_all(fragment, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a storefront price into whole currency units, truncating decimals.
///
/// Accepts Turkish formatting (`"1.499,00 TL"`, `"₺1.299,99"`), plain
/// decimals (`"1499.90"`) and English grouping (`"1,499.00"`). HTML tags and
/// currency symbols around the number are ignored. Returns `None` when the
/// text holds no number.
#[must_use]
pub fn parse_locale_price(raw: &str) -> Option<i64> {
    let text = strip_tags(raw);
    let token = PRICE_RE.find(&text)?.as_str();
    let token = token.trim_end_matches(['.', ',']);

    let integer_part = match (token.rfind('.'), token.rfind(',')) {
        // Both separators present: whichever comes last is the decimal mark.
        (Some(dot), Some(comma)) => &token[..dot.max(comma)],
        (None, Some(comma)) => decimal_or_grouped(token, comma),
        (Some(dot), None) => decimal_or_grouped(token, dot),
        (None, None) => token,
    };

    let digits: String = integer_part.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// With a single kind of separator, `"1.499"` / `"1,499"` are thousands
/// groups while `"1499.90"` / `"1499,9"` carry decimals.
fn decimal_or_grouped(token: &str, last_sep: usize) -> &str {
    let sep = token.as_bytes()[last_sep];
    let grouped = token.split(char::from(sep)).skip(1).all(|g| g.len() == 3);
    if grouped {
        token
    } else {
        &token[..last_sep]
    }
}

/// Reads a discount badge such as `"-30%"`, `"%20"` or `"%25 indirim"`.
/// Values are clamped to `0..=100`.
#[must_use]
pub fn parse_discount_percent(raw: &str) -> Option<i32> {
    let text = strip_tags(raw);
    let caps = PERCENT_RE.captures(&text)?;
    let number = caps.get(1).or_else(|| caps.get(2))?.as_str();
    number.parse::<i32>().ok().map(|v| v.clamp(0, 100))
}

/// Percentage saved going from `original` to `sale`, rounded half up.
/// Returns 0 when there is no real reduction.
#[must_use]
pub fn derive_discount(original: i64, sale: i64) -> i32 {
    if original <= 0 || sale <= 0 || sale >= original {
        return 0;
    }
    let saved = (original - sale) * 100;
    let percent = (saved + original / 2) / original;
    i32::try_from(percent.clamp(0, 100)).unwrap_or(0)
}

/// Resolves `href` against `domain` (an origin such as
/// `https://www.adidas.com.tr`).
///
/// Returns `None` for empty hrefs, in-page anchors and non-navigational
/// schemes (`javascript:`, `mailto:`, `tel:`).
#[must_use]
pub fn absolutize_url(domain: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(href.to_owned());
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }

    let domain = domain.trim_end_matches('/');
    match href.strip_prefix('/') {
        Some(path) => Some(format!("{domain}/{path}")),
        None => Some(format!("{domain}/{href}")),
    }
}

/// Scheme and host of `page_url`, the base relative links resolve against.
///
/// `"https://www.adidas.com.tr/tr/ultraboost-22/GX5463.html"` →
/// `"https://www.adidas.com.tr"`.
#[must_use]
pub fn extract_origin(page_url: &str) -> String {
    match reqwest::Url::parse(page_url) {
        Ok(url) => url.origin().ascii_serialization(),
        Err(error) => {
            tracing::warn!(page_url, %error, "unparseable page url; cutting origin by hand");
            let host_start = page_url.find("://").map_or(0, |i| i + 3);
            let host_end = page_url[host_start..]
                .find('/')
                .map_or(page_url.len(), |i| host_start + i);
            page_url[..host_end].to_owned()
        }
    }
}

/// Host of `url` for log fields, or `url` itself when it does not parse.
#[must_use]
pub fn extract_host(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

/// Drops the query string and fragment so tracking parameters do not create
/// duplicate endpoints.
#[must_use]
pub fn canonical_url(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].to_owned()
}

/// Removes repeated values, keeping the first occurrence of each.
#[must_use]
pub fn dedupe_preserving_order<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// HTML attributes the extractors read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Class,
    Value,
    DataSize,
    DataStockStatus,
    AriaDisabled,
}

impl Attr {
    const ALL: [Attr; 5] = [
        Attr::Class,
        Attr::Value,
        Attr::DataSize,
        Attr::DataStockStatus,
        Attr::AriaDisabled,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Attr::Class => "class",
            Attr::Value => "value",
            Attr::DataSize => "data-size",
            Attr::DataStockStatus => "data-stock-status",
            Attr::AriaDisabled => "aria-disabled",
        }
    }
}

// Indexed by `Attr as usize`, in `Attr::ALL` order.
static ATTRIBUTE_RES: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    Attr::ALL.map(|attr| {
        Regex::new(&format!(
            r#"(?is)\s{}\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#,
            regex::escape(attr.name())
        ))
        .expect("valid attribute regex")
    })
});

/// Value of `attr` on the first tag of an HTML fragment.
///
/// `attribute(r#"<option data-size="42">"#, Attr::DataSize)` → `Some("42")`.
#[must_use]
pub fn attribute(fragment: &str, attr: Attr) -> Option<String> {
    let caps = ATTRIBUTE_RES[attr as usize].captures(fragment)?;
    let value = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
    let value = value.as_str().trim();
    (!value.is_empty()).then(|| value.to_owned())
}

/// `true` when the `class` attribute of `fragment` contains a class whose
/// name includes `needle` (case-insensitive).
#[must_use]
pub fn has_class_containing(fragment: &str, needle: &str) -> bool {
    let needle = needle.to_ascii_lowercase();
    attribute(fragment, Attr::Class).is_some_and(|classes| {
        classes
            .split_whitespace()
            .any(|c| c.to_ascii_lowercase().contains(&needle))
    })
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
