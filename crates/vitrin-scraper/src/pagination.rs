//! Offset pagination over category listing pages.
//!
//! Storefront listings are paged by an item offset (`start=48`, `from=40`)
//! rather than a cursor. There is no total count to rely on: the last page is
//! the first one that returns fewer items than the brand's page size.

use std::future::Future;

use crate::error::ScraperError;

/// Maximum number of listing pages per category before giving up.
/// Guards against storefronts that ignore the offset and repeat page one.
pub const MAX_PAGES: usize = 200;

/// Totals for one paginated crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageSummary {
    pub pages: usize,
    pub items: usize,
}

/// Calls `fetch_page(offset)` for offsets `0, page_size, 2 * page_size, …`
/// until a page yields fewer than `page_size` items.
///
/// `fetch_page` returns the number of items it found on that page. A
/// `page_size` of zero is treated as one so the loop always advances.
///
/// # Errors
///
/// Propagates the first error from `fetch_page`, or returns
/// [`ScraperError::PaginationLimit`] (converted into `E`) once more than
/// `max_pages` pages would be requested.
pub async fn paginate_offsets<F, Fut, E>(
    listing_url: &str,
    page_size: usize,
    max_pages: usize,
    mut fetch_page: F,
) -> Result<PageSummary, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<usize, E>>,
    E: From<ScraperError>,
{
    let page_size = page_size.max(1);
    let mut summary = PageSummary::default();

    loop {
        if summary.pages >= max_pages {
            return Err(ScraperError::PaginationLimit {
                url: listing_url.to_owned(),
                max_pages,
            }
            .into());
        }

        let offset = summary.pages * page_size;
        let found = fetch_page(offset).await?;
        summary.pages += 1;
        summary.items += found;

        tracing::debug!(
            listing_url,
            offset,
            found,
            page_size,
            "listing page fetched"
        );

        if found < page_size {
            return Ok(summary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "https://www.adidas.com.tr/tr/erkek";

    /// Drives a crawl where page `n` yields `pages[n]` items (0 past the end).
    async fn run(
        pages: &[usize],
        page_size: usize,
        max_pages: usize,
    ) -> (Result<PageSummary, ScraperError>, Vec<usize>) {
        let mut offsets = Vec::new();
        let result = paginate_offsets(LISTING, page_size, max_pages, |offset| {
            offsets.push(offset);
            let found = pages.get(offset / page_size).copied().unwrap_or(0);
            async move { Ok::<usize, ScraperError>(found) }
        })
        .await;
        (result, offsets)
    }

    #[tokio::test]
    async fn stops_after_first_short_page() {
        let (result, offsets) = run(&[48, 48, 12], 48, MAX_PAGES).await;
        let summary = result.unwrap();
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.items, 108);
        assert_eq!(offsets, vec![0, 48, 96]);
    }

    #[tokio::test]
    async fn empty_first_page_stops_immediately() {
        let (result, offsets) = run(&[0], 40, MAX_PAGES).await;
        assert_eq!(result.unwrap(), PageSummary { pages: 1, items: 0 });
        assert_eq!(offsets, vec![0]);
    }

    #[tokio::test]
    async fn exact_multiple_needs_one_empty_page() {
        let (result, offsets) = run(&[40, 40], 40, MAX_PAGES).await;
        assert_eq!(result.unwrap(), PageSummary { pages: 3, items: 80 });
        assert_eq!(offsets, vec![0, 40, 80]);
    }

    #[tokio::test]
    async fn errors_when_page_limit_exceeded() {
        let (result, offsets) = run(&[48; 10], 48, 3).await;
        assert!(matches!(
            result,
            Err(ScraperError::PaginationLimit { max_pages: 3, .. })
        ));
        assert_eq!(offsets.len(), 3);
    }

    #[tokio::test]
    async fn propagates_page_error() {
        let mut calls = 0usize;
        let result = paginate_offsets(LISTING, 40, MAX_PAGES, |_offset| {
            calls += 1;
            let n = calls;
            async move {
                if n == 2 {
                    Err(ScraperError::RateLimited {
                        retry_after_secs: 1,
                    })
                } else {
                    Ok(40)
                }
            }
        })
        .await;
        assert!(matches!(result, Err(ScraperError::RateLimited { .. })));
        assert_eq!(calls, 2);
    }
}
