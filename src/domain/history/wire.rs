//! Wire types for the client trade-history endpoint.

use crate::shared::serde_util::{self, decimal_lenient, opt_decimal_lenient};
use crate::shared::Side;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

/// Envelope of `GET /api/user/client-history`.
#[derive(Deserialize, Debug, Clone)]
pub struct HistoryResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub data: Vec<TradeRecordResponse>,
    #[serde(default, deserialize_with = "serde_util::opt_string_or_number")]
    pub page: Option<String>,
    /// Page number, or a full link carrying a `page` query parameter.
    #[serde(default, deserialize_with = "serde_util::opt_string_or_number")]
    pub next_page: Option<String>,
    #[serde(default, deserialize_with = "serde_util::opt_string_or_number")]
    pub previous_page: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// One executed or cancelled order.
#[derive(Deserialize, Debug, Clone)]
pub struct TradeRecordResponse {
    pub created_at: Value,
    pub side: Side,
    #[serde(deserialize_with = "decimal_lenient::deserialize")]
    pub size: Decimal,
    #[serde(default)]
    pub state: String,
    #[serde(default, deserialize_with = "opt_decimal_lenient::deserialize")]
    pub average_fill_price: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_decimal_lenient::deserialize")]
    pub paid_commission: Option<Decimal>,
    pub symbol: String,
}
