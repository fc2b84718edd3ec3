//! Pagination of Scalingo listing endpoints.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of records requested per page.
pub const PAGE_SIZE: u32 = 50;

/// Upper bound on the records reserved up front from the announced count.
const MAX_PREALLOCATED: u64 = 10_000;

/// Query parameters of a paginated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationOpts {
    /// Page number (1-indexed).
    pub page: u32,
    /// Number of records per page.
    pub per_page: u32,
}

impl PaginationOpts {
    /// Pagination params for a specific page.
    #[must_use]
    pub fn for_page(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }
}

/// Pagination metadata returned with every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Page this metadata describes.
    #[serde(default)]
    pub current_page: u32,
    /// Previous page, if any.
    #[serde(default)]
    pub prev_page: Option<u32>,
    /// Next page, if any.
    #[serde(default)]
    pub next_page: Option<u32>,
    /// Number of pages in the listing.
    pub total_pages: u32,
    /// Number of records in the listing.
    pub total_count: u64,
}

/// Fetch every page of a listing and concatenate them in page order.
///
/// The page count announced by the first response bounds the loop. The first
/// error aborts the whole fetch: already fetched pages are discarded and no
/// further page is requested. Dropping the returned future cancels the
/// in-flight request and the remaining pages.
pub async fn fetch_all<T, E, F, Fut>(mut list: F) -> Result<Vec<T>, E>
where
    F: FnMut(PaginationOpts) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, PaginationMeta), E>>,
{
    let (first, meta) = list(PaginationOpts::for_page(1, PAGE_SIZE)).await?;
    debug!(
        total_pages = meta.total_pages,
        total_count = meta.total_count,
        "fetched page 1"
    );

    let mut items = Vec::with_capacity(initial_capacity(&meta));
    items.extend(first);

    for page in 2..=meta.total_pages {
        let (page_items, _) = list(PaginationOpts::for_page(page, PAGE_SIZE)).await?;
        debug!(page, count = page_items.len(), "fetched page");
        items.extend(page_items);
    }

    Ok(items)
}

/// Records to reserve for a listing, trusting `total_count` only as far as
/// the page count can back it.
fn initial_capacity(meta: &PaginationMeta) -> usize {
    let backed = u64::from(meta.total_pages.max(1)).saturating_mul(u64::from(PAGE_SIZE));
    let capacity = meta.total_count.min(backed).min(MAX_PREALLOCATED);
    usize::try_from(capacity).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn meta(total_pages: u32, total_count: u64) -> PaginationMeta {
        PaginationMeta {
            total_pages,
            total_count,
            ..Default::default()
        }
    }

    /// Serve `0..total` split into pages of `per_page`.
    fn pages(total: u32, per_page: u32) -> impl Fn(PaginationOpts) -> Vec<u32> {
        move |opts| {
            let start = (opts.page - 1) * per_page;
            (start..total.min(start + per_page)).collect()
        }
    }

    #[tokio::test]
    async fn test_fetch_all_concatenates_in_page_order() {
        for per_page in [1, 3, 7, 25, 100] {
            let serve = pages(25, per_page);
            let total_pages = 25u32.div_ceil(per_page);

            let items: Vec<u32> = fetch_all(|opts| {
                let page = serve(opts);
                async move { Ok::<_, String>((page, meta(total_pages, 25))) }
            })
            .await
            .unwrap();

            assert_eq!(items, (0..25).collect::<Vec<_>>(), "per_page = {}", per_page);
        }
    }

    #[tokio::test]
    async fn test_fetch_all_requests_fixed_page_size() {
        let items: Vec<u32> = fetch_all(|opts| async move {
            assert_eq!(opts.per_page, PAGE_SIZE);
            Ok::<_, String>((vec![opts.page], meta(3, 3)))
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_all_empty_listing() {
        let calls = AtomicU32::new(0);
        let items: Vec<u32> = fetch_all(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>((vec![], meta(0, 0))) }
        })
        .await
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_aborts_on_failed_page() {
        let calls = AtomicU32::new(0);
        let result: Result<Vec<u32>, String> = fetch_all(|opts| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if opts.page == 2 {
                    Err("page 2 unavailable".to_string())
                } else {
                    Ok((vec![opts.page], meta(4, 4)))
                }
            }
        })
        .await;

        assert_eq!(result, Err("page 2 unavailable".to_string()));
        // Pages 3 and 4 are never requested.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_all_ignores_oversized_total_count() {
        let items: Vec<u32> = fetch_all(|opts| async move {
            Ok::<_, String>((vec![opts.page], meta(1, u64::MAX)))
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1]);
    }

    #[test]
    fn test_initial_capacity_is_bounded() {
        assert_eq!(initial_capacity(&meta(3, 120)), 120);
        assert_eq!(initial_capacity(&meta(1, u64::MAX)), PAGE_SIZE as usize);
        assert_eq!(initial_capacity(&meta(0, 0)), 0);
        assert_eq!(
            initial_capacity(&meta(u32::MAX, u64::MAX)),
            MAX_PREALLOCATED as usize
        );
    }

    #[tokio::test]
    async fn test_fetch_all_stops_when_dropped() {
        let calls = AtomicU32::new(0);
        let fetch = fetch_all(|opts| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if opts.page == 2 {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                Ok::<_, String>((vec![opts.page], meta(5, 5)))
            }
        });

        let outcome = tokio::time::timeout(Duration::from_millis(50), fetch).await;

        assert!(outcome.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
