//! History sub-client: paginated trade history.

use std::sync::Arc;

use crate::client::DashboardClient;
use crate::domain::history::{HistoryCursor, HistoryPages, TradeRecord};
use crate::error::SyncError;
use crate::pagination::{Page, PageCursor, PageSource, PaginationCursor};

pub struct History<'a> {
    pub(crate) client: &'a DashboardClient,
}

impl<'a> History<'a> {
    async fn pages(&self) -> Result<HistoryPages, SyncError> {
        let identity = self.client.session.require_identity().await?;
        Ok(HistoryPages::new(
            self.client.source.clone(),
            identity.email,
            self.client.config.history_page_size,
            self.client.config.request_timeout,
        ))
    }

    /// A cursor positioned on the first page.
    pub async fn cursor(&self) -> Result<HistoryCursor, SyncError> {
        let mut cursor = PaginationCursor::new(Arc::new(self.pages().await?));
        cursor.load(PageCursor::from(1)).await?;
        Ok(cursor)
    }

    /// A cursor that has not loaded anything yet.
    pub async fn idle_cursor(&self) -> Result<HistoryCursor, SyncError> {
        Ok(PaginationCursor::new(Arc::new(self.pages().await?)))
    }

    /// Fetch a single page.
    pub async fn page(&self, page: u32) -> Result<Page<TradeRecord>, SyncError> {
        let pages = self.pages().await?;
        Ok(pages.fetch_page(&PageCursor::from(page)).await?)
    }
}
