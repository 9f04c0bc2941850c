//! Server-driven page traversal.
//!
//! The backend owns the cursors: every page carries the tokens for its
//! neighbours and [`PaginationCursor`] only ever follows them. Filtering is
//! applied to the currently loaded page, never across pages.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::FetchError;

/// Opaque page token issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u32> for PageCursor {
    fn from(page: u32) -> Self {
        Self(page.to_string())
    }
}

impl From<&str> for PageCursor {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PageCursor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One page of results plus the backend's neighbour tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: PageCursor,
    pub next_cursor: Option<PageCursor>,
    pub prev_cursor: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Fetches a single page.
pub trait PageSource<T>: Send + Sync {
    fn fetch_page<'a>(&'a self, cursor: &'a PageCursor) -> BoxFuture<'a, Result<Page<T>, FetchError>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    Idle,
    Loading,
    Loaded,
    Errored(FetchError),
}

/// Walks a paginated collection one page at a time.
pub struct PaginationCursor<T> {
    source: Arc<dyn PageSource<T>>,
    state: watch::Sender<PageState>,
    page: Option<Page<T>>,
    /// Token of the most recent request, kept for `retry`.
    requested: Option<PageCursor>,
}

impl<T> PaginationCursor<T> {
    pub fn new(source: Arc<dyn PageSource<T>>) -> Self {
        let (state, _) = watch::channel(PageState::Idle);
        Self {
            source,
            state,
            page: None,
            requested: None,
        }
    }

    pub fn state(&self) -> PageState {
        self.state.borrow().clone()
    }

    /// Observe state transitions from another task.
    pub fn watch_state(&self) -> watch::Receiver<PageState> {
        self.state.subscribe()
    }

    /// The loaded page. After a failure this is the last good page with its
    /// neighbour tokens cleared.
    pub fn page(&self) -> Option<&Page<T>> {
        self.page.as_ref()
    }

    pub fn can_next(&self) -> bool {
        self.page.as_ref().is_some_and(|p| p.next_cursor.is_some())
    }

    pub fn can_prev(&self) -> bool {
        self.page.as_ref().is_some_and(|p| p.prev_cursor.is_some())
    }

    /// Load the page at `cursor`.
    pub async fn load(&mut self, cursor: PageCursor) -> Result<(), FetchError> {
        self.state.send_replace(PageState::Loading);
        self.requested = Some(cursor.clone());

        match self.source.fetch_page(&cursor).await {
            Ok(page) => {
                tracing::debug!(
                    cursor = %page.cursor,
                    items = page.items.len(),
                    next = ?page.next_cursor.as_ref().map(PageCursor::as_str),
                    prev = ?page.prev_cursor.as_ref().map(PageCursor::as_str),
                    "Page loaded"
                );
                self.page = Some(page);
                self.state.send_replace(PageState::Loaded);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(cursor = %cursor, "Page load failed: {}", e);
                if let Some(page) = self.page.as_mut() {
                    page.next_cursor = None;
                    page.prev_cursor = None;
                }
                self.state.send_replace(PageState::Errored(e.clone()));
                Err(e)
            }
        }
    }

    /// Follow the next-page token. `Ok(false)` when there is none.
    pub async fn next(&mut self) -> Result<bool, FetchError> {
        let Some(cursor) = self.page.as_ref().and_then(|p| p.next_cursor.clone()) else {
            return Ok(false);
        };
        self.load(cursor).await.map(|()| true)
    }

    /// Follow the previous-page token. `Ok(false)` when there is none.
    pub async fn prev(&mut self) -> Result<bool, FetchError> {
        let Some(cursor) = self.page.as_ref().and_then(|p| p.prev_cursor.clone()) else {
            return Ok(false);
        };
        self.load(cursor).await.map(|()| true)
    }

    /// Re-request the last failed token. `Ok(false)` when nothing failed.
    pub async fn retry(&mut self) -> Result<bool, FetchError> {
        if !matches!(*self.state.borrow(), PageState::Errored(_)) {
            return Ok(false);
        }
        let Some(cursor) = self.requested.clone() else {
            return Ok(false);
        };
        self.load(cursor).await.map(|()| true)
    }

    /// Items of the loaded page accepted by `filter`.
    pub fn visible(&self, filter: impl Fn(&T) -> bool) -> Vec<&T> {
        self.page
            .as_ref()
            .map(|p| p.items.iter().filter(|&item| filter(item)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Three pages of five numbers; page 2 fails once when `flaky` is set.
    struct Numbers {
        flaky: Mutex<bool>,
        calls: Mutex<Vec<String>>,
    }

    impl Numbers {
        fn new(flaky: bool) -> Arc<Self> {
            Arc::new(Self {
                flaky: Mutex::new(flaky),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl PageSource<u32> for Numbers {
        fn fetch_page<'a>(
            &'a self,
            cursor: &'a PageCursor,
        ) -> BoxFuture<'a, Result<Page<u32>, FetchError>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(cursor.to_string());
                let n: u32 = cursor
                    .as_str()
                    .parse()
                    .map_err(|_| FetchError::Http {
                        status: 404,
                        body: String::new(),
                    })?;
                if n == 2 && std::mem::take(&mut *self.flaky.lock().unwrap()) {
                    return Err(FetchError::Network("reset".into()));
                }
                Ok(Page {
                    items: ((n - 1) * 5..n * 5).collect(),
                    cursor: cursor.clone(),
                    next_cursor: (n < 3).then(|| PageCursor::from(n + 1)),
                    prev_cursor: (n > 1).then(|| PageCursor::from(n - 1)),
                })
            })
        }
    }

    #[tokio::test]
    async fn test_next_then_prev_is_symmetric() {
        let mut cursor = PaginationCursor::new(Numbers::new(false));
        assert_eq!(cursor.state(), PageState::Idle);
        cursor.load(PageCursor::from(2)).await.unwrap();
        let before = cursor.page().cloned().unwrap();

        assert!(cursor.next().await.unwrap());
        assert_eq!(cursor.page().unwrap().cursor.as_str(), "3");
        assert!(!cursor.can_next());

        assert!(cursor.prev().await.unwrap());
        assert_eq!(cursor.page(), Some(&before));
    }

    #[tokio::test]
    async fn test_boundaries_do_not_fetch() {
        let source = Numbers::new(false);
        let mut cursor = PaginationCursor::new(source.clone());
        cursor.load(PageCursor::from(1)).await.unwrap();
        assert!(!cursor.can_prev());
        assert!(!cursor.prev().await.unwrap());
        assert_eq!(source.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_error_clears_cursors_and_retry_recovers() {
        let source = Numbers::new(true);
        let mut cursor = PaginationCursor::new(source.clone());
        cursor.load(PageCursor::from(1)).await.unwrap();

        let err = cursor.next().await.unwrap_err();
        assert!(matches!(cursor.state(), PageState::Errored(ref e) if *e == err));
        assert!(!cursor.can_next());
        assert!(!cursor.can_prev());
        assert_eq!(cursor.page().unwrap().cursor.as_str(), "1");

        assert!(cursor.retry().await.unwrap());
        assert_eq!(cursor.state(), PageState::Loaded);
        assert_eq!(cursor.page().unwrap().cursor.as_str(), "2");
        assert_eq!(*source.calls.lock().unwrap(), vec!["1", "2", "2"]);
        assert!(!cursor.retry().await.unwrap());
    }

    #[tokio::test]
    async fn test_visible_filters_current_page_only() {
        let mut cursor = PaginationCursor::new(Numbers::new(false));
        assert!(cursor.visible(|_| true).is_empty());
        cursor.load(PageCursor::from(1)).await.unwrap();
        let evens: Vec<u32> = cursor.visible(|n| n % 2 == 0).into_iter().copied().collect();
        assert_eq!(evens, vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_state_transitions_observable() {
        let mut cursor = PaginationCursor::new(Numbers::new(false));
        let mut rx = cursor.watch_state();
        let load = cursor.load(PageCursor::from(1));
        let observe = async {
            rx.changed().await.unwrap();
            rx.borrow_and_update().clone()
        };
        let (_, seen) = tokio::join!(load, observe);
        assert!(matches!(seen, PageState::Loading | PageState::Loaded));
        assert_eq!(*rx.borrow(), PageState::Loaded);
    }
}
