//! Trade history domain: paginated client order history.

pub mod client;
mod convert;
pub mod wire;

use crate::error::FetchError;
use crate::pagination::{Page, PageCursor, PageSource, PaginationCursor};
use crate::shared::{Side, Symbol};
use crate::source::{decode_json, Endpoint, RemoteDataSource, Request};
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;

/// Cursor over the signed-in user's trade history.
pub type HistoryCursor = PaginationCursor<TradeRecord>;

/// Final state of a historical order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TradeState {
    Filled,
    Cancelled,
    Other(String),
}

impl TradeState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Filled => "filled",
            Self::Cancelled => "cancelled",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for TradeState {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "filled" => Self::Filled,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl std::fmt::Display for TradeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TradeState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TradeState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(TradeState::from(s.as_str()))
    }
}

/// One historical order. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub created_at: DateTime<Utc>,
    pub side: Side,
    pub size: Decimal,
    pub state: TradeState,
    pub average_fill_price: Option<Decimal>,
    pub paid_commission: Option<Decimal>,
    pub symbol: Symbol,
}

/// Client-side filter over the loaded page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeFilter {
    pub symbol: Option<String>,
    pub side: Option<Side>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TradeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    /// Inclusive lower bound on `created_at`.
    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Inclusive upper bound on `created_at`.
    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn matches(&self, record: &TradeRecord) -> bool {
        let symbol_ok = match self.symbol.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(s) => record.symbol.eq_ignore_case(s),
        };
        symbol_ok
            && self.side.map_or(true, |side| record.side == side)
            && self.from.map_or(true, |from| record.created_at >= from)
            && self.to.map_or(true, |to| record.created_at <= to)
    }
}

/// Fetches history pages for one user.
pub struct HistoryPages {
    source: Arc<dyn RemoteDataSource>,
    email: String,
    page_size: u32,
    timeout: Duration,
}

impl HistoryPages {
    pub fn new(
        source: Arc<dyn RemoteDataSource>,
        email: impl Into<String>,
        page_size: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            email: email.into(),
            page_size,
            timeout,
        }
    }

    fn request(&self, cursor: &PageCursor) -> Request {
        Request::new(Endpoint::ClientHistory)
            .param("email", &self.email)
            .param("page", cursor)
            .param("page_size", self.page_size)
    }
}

impl PageSource<TradeRecord> for HistoryPages {
    fn fetch_page<'a>(
        &'a self,
        cursor: &'a PageCursor,
    ) -> BoxFuture<'a, Result<Page<TradeRecord>, FetchError>> {
        Box::pin(async move {
            let payload = tokio::time::timeout(self.timeout, self.source.fetch(self.request(cursor)))
                .await
                .map_err(|_| FetchError::timeout())??;
            let resp: wire::HistoryResponse = decode_json(payload)?;
            convert::into_page(resp, cursor)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedSource;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn rows(page: u32, n: u32) -> Vec<Value> {
        (0..n)
            .map(|i| {
                json!({
                    "created_at": format!("2024-05-{:02}T10:{:02}:00Z", page, i),
                    "side": if i % 2 == 0 { "buy" } else { "sell" },
                    "size": "0.5",
                    "state": if i % 5 == 4 { "CANCELLED" } else { "filled" },
                    "average_fill_price": if i % 5 == 4 { Value::Null } else { json!("64000.10") },
                    "paid_commission": 0.12,
                    "symbol": if i % 3 == 0 { "ETHUSDT" } else { "BTCUSDT" }
                })
            })
            .collect()
    }

    fn history_page(page: u32, next: Option<u32>, prev: Option<u32>) -> Value {
        json!({
            "status": "success",
            "count": 45,
            "data": rows(page, 20),
            "page": page,
            "next_page": next,
            "previous_page": prev,
            "page_size": 20
        })
    }

    fn cursor(source: &ScriptedSource) -> HistoryCursor {
        PaginationCursor::new(Arc::new(HistoryPages::new(
            Arc::new(source.clone()),
            "trader@example.com",
            20,
            Duration::from_secs(5),
        )))
    }

    #[tokio::test]
    async fn test_page_forward_and_back_is_identical() {
        let source = ScriptedSource::new();
        let path = "/api/user/client-history";
        source.push_ok(path, history_page(1, Some(2), None));
        source.push_ok(path, history_page(2, Some(3), Some(1)));
        source.push_ok(path, history_page(1, Some(2), None));

        let mut cursor = cursor(&source);
        cursor.load(PageCursor::from(1)).await.unwrap();
        let first = cursor.page().cloned().unwrap();
        assert_eq!(first.len(), 20);
        assert_eq!(first.next_cursor, Some(PageCursor::from(2)));
        assert_eq!(first.prev_cursor, None);

        assert!(cursor.next().await.unwrap());
        assert_eq!(cursor.page().unwrap().cursor.as_str(), "2");
        assert!(cursor.prev().await.unwrap());
        assert_eq!(cursor.page(), Some(&first));

        let requests = source.requests();
        assert_eq!(
            requests[1].path_and_query(),
            "/api/user/client-history?email=trader%40example.com&page=2&page_size=20"
        );
    }

    #[tokio::test]
    async fn test_records_parse() {
        let source = ScriptedSource::new();
        source.push_ok("/api/user/client-history", history_page(3, None, Some(2)));
        let mut cursor = cursor(&source);
        cursor.load(PageCursor::from(3)).await.unwrap();

        let page = cursor.page().unwrap();
        let r = &page.items[4];
        assert_eq!(r.state, TradeState::Cancelled);
        assert_eq!(r.average_fill_price, None);
        assert_eq!(r.paid_commission, Some(Decimal::new(12, 2)));
        assert_eq!(
            r.created_at,
            Utc.with_ymd_and_hms(2024, 5, 3, 10, 4, 0).unwrap()
        );
        assert!(!cursor.can_next());
    }

    #[tokio::test]
    async fn test_filters_only_narrow_current_page() {
        let source = ScriptedSource::new();
        source.push_ok("/api/user/client-history", history_page(1, Some(2), None));
        let mut cursor = cursor(&source);
        cursor.load(PageCursor::from(1)).await.unwrap();

        let eth = TradeFilter::new().symbol("ethusdt");
        assert_eq!(cursor.visible(|r| eth.matches(r)).len(), 7);

        let eth_buys = TradeFilter::new().symbol("ETHUSDT").side(Side::Buy);
        assert!(cursor
            .visible(|r| eth_buys.matches(r))
            .iter()
            .all(|r| r.side == Side::Buy));

        let window = TradeFilter::new()
            .from(Utc.with_ymd_and_hms(2024, 5, 1, 10, 5, 0).unwrap())
            .to(Utc.with_ymd_and_hms(2024, 5, 1, 10, 9, 0).unwrap());
        assert_eq!(cursor.visible(|r| window.matches(r)).len(), 5);
        assert_eq!(cursor.visible(|r| TradeFilter::new().matches(r)).len(), 20);
    }

    #[tokio::test]
    async fn test_malformed_page_is_schema_error() {
        let source = ScriptedSource::new();
        source.push_ok("/api/user/client-history", json!({"data": "oops"}));
        let mut cursor = cursor(&source);
        let err = cursor.load(PageCursor::from(1)).await.unwrap_err();
        assert!(matches!(err, FetchError::Schema(_)));
        assert!(!cursor.can_next());
    }
}
