use std::collections::HashSet;
use std::future::Future;

use log::{debug, warn};

use crate::error::Result;

/// One page of a continuation-token paginated listing.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the next page; `None` (or blank) on the last page
    pub continuation: Option<String>,
}

/// Follows continuation cursors until the source reports no further page.
///
/// `fetch_page` receives `None` for the first request and the previous page's
/// cursor afterwards. A cursor the source already handed out ends the loop.
pub async fn collect_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut all_items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut seen_cursors = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = fetch_page(cursor.clone()).await?;
        pages += 1;
        all_items.extend(page.items);

        let Some(next) = page.continuation.filter(|c| !c.trim().is_empty()) else {
            break;
        };

        if !seen_cursors.insert(next.clone()) {
            warn!("Continuation token repeated after {pages} pages, stopping pagination");
            break;
        }

        cursor = Some(next);
    }

    debug!("Collected {} items across {pages} pages", all_items.len());

    Ok(all_items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DoraLensError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory source serving fixed pages keyed by cursor.
    struct FakePagedSource {
        pages: HashMap<Option<String>, Page<u64>>,
        requested: Mutex<Vec<Option<String>>>,
    }

    impl FakePagedSource {
        fn three_pages() -> Self {
            let mut pages = HashMap::new();
            pages.insert(
                None,
                Page {
                    items: vec![1, 2, 3],
                    continuation: Some("page-2".to_string()),
                },
            );
            pages.insert(
                Some("page-2".to_string()),
                Page {
                    items: vec![4, 5],
                    continuation: Some("page-3".to_string()),
                },
            );
            pages.insert(
                Some("page-3".to_string()),
                Page {
                    items: vec![6],
                    continuation: None,
                },
            );
            Self {
                pages,
                requested: Mutex::new(Vec::new()),
            }
        }

        async fn fetch(&self, cursor: Option<String>) -> Result<Page<u64>> {
            self.requested.lock().unwrap().push(cursor.clone());
            let page = self
                .pages
                .get(&cursor)
                .ok_or_else(|| DoraLensError::Config(format!("unknown cursor {cursor:?}")))?;
            Ok(Page {
                items: page.items.clone(),
                continuation: page.continuation.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_collects_union_of_all_pages() {
        let source = FakePagedSource::three_pages();

        let items = collect_pages(|cursor| source.fetch(cursor)).await.unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(
            *source.requested.lock().unwrap(),
            vec![None, Some("page-2".to_string()), Some("page-3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_single_page_without_cursor() {
        let items = collect_pages(|_| async {
            Ok(Page {
                items: vec!["only"],
                continuation: None,
            })
        })
        .await
        .unwrap();

        assert_eq!(items, vec!["only"]);
    }

    #[tokio::test]
    async fn test_blank_cursor_ends_pagination() {
        let items = collect_pages(|_| async {
            Ok(Page {
                items: vec![1],
                continuation: Some("   ".to_string()),
            })
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1]);
    }

    #[tokio::test]
    async fn test_repeated_cursor_stops_loop() {
        let calls = Mutex::new(0);
        let items = collect_pages(|_| {
            *calls.lock().unwrap() += 1;
            async {
                Ok(Page {
                    items: vec![1],
                    continuation: Some("same".to_string()),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(*calls.lock().unwrap(), 2);
        assert_eq!(items, vec![1, 1]);
    }

    #[tokio::test]
    async fn test_page_error_propagates() {
        let result: Result<Vec<u64>> = collect_pages(|cursor| async move {
            match cursor {
                None => Ok(Page {
                    items: vec![1],
                    continuation: Some("next".to_string()),
                }),
                Some(_) => Err(DoraLensError::Api {
                    status: 500,
                    message: "boom".to_string(),
                }),
            }
        })
        .await;

        assert!(matches!(result, Err(DoraLensError::Api { status: 500, .. })));
    }
}
