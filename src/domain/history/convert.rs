//! Conversions from wire types to domain types for trade history.

use super::wire::{HistoryResponse, TradeRecordResponse};
use super::{TradeRecord, TradeState};
use crate::error::FetchError;
use crate::pagination::{Page, PageCursor};
use crate::shared::serde_util::timestamp_lenient;
use chrono::{DateTime, Utc};
use serde_json::Value;

impl TryFrom<TradeRecordResponse> for TradeRecord {
    type Error = FetchError;

    fn try_from(t: TradeRecordResponse) -> Result<Self, Self::Error> {
        let created_at = match &t.created_at {
            Value::String(s) => timestamp_lenient::parse(s).map_err(FetchError::Schema)?,
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .ok_or_else(|| FetchError::Schema(format!("Invalid timestamp: {}", n)))?,
            other => {
                return Err(FetchError::Schema(format!(
                    "expected created_at timestamp, got {}",
                    other
                )))
            }
        };
        Ok(Self {
            created_at,
            side: t.side,
            size: t.size,
            state: TradeState::from(t.state.as_str()),
            average_fill_price: t.average_fill_price,
            paid_commission: t.paid_commission,
            symbol: t.symbol.into(),
        })
    }
}

/// Extract a page token from a page number or a link such as
/// `https://host/api/user/client-history?email=a&page=3`.
pub(crate) fn page_token(raw: &str) -> PageCursor {
    let Some((_, query)) = raw.split_once('?') else {
        return PageCursor::new(raw.trim());
    };
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "page")
        .map(|(_, v)| PageCursor::new(v))
        .unwrap_or_else(|| PageCursor::new("1"))
}

pub(crate) fn into_page(
    resp: HistoryResponse,
    requested: &PageCursor,
) -> Result<Page<TradeRecord>, FetchError> {
    let items = resp
        .data
        .into_iter()
        .map(TradeRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page {
        items,
        cursor: resp
            .page
            .map(PageCursor::from)
            .unwrap_or_else(|| requested.clone()),
        next_cursor: resp.next_page.as_deref().map(page_token),
        prev_cursor: resp.previous_page.as_deref().map(page_token),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_token_from_number_and_link() {
        assert_eq!(page_token("2").as_str(), "2");
        assert_eq!(
            page_token("http://localhost:8000/api/user/client-history?email=a%40b.c&page=3&page_size=20")
                .as_str(),
            "3"
        );
        // DRF omits `page` when linking back to the first page.
        assert_eq!(
            page_token("http://localhost:8000/api/user/client-history?email=a").as_str(),
            "1"
        );
    }

    #[test]
    fn test_bad_timestamp_is_schema_error() {
        let wire: TradeRecordResponse = serde_json::from_value(serde_json::json!({
            "created_at": "yesterday",
            "side": "buy",
            "size": "1",
            "state": "filled",
            "symbol": "BTCUSDT"
        }))
        .unwrap();
        assert!(matches!(
            TradeRecord::try_from(wire),
            Err(FetchError::Schema(_))
        ));
    }
}
