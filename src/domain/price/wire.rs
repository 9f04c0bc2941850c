//! Wire types for the live price feed.

use crate::shared::serde_util::decimal_lenient;
use crate::shared::Symbol;
use rust_decimal::Decimal;
use serde::Deserialize;

/// One element of `GET /api/cryptolive-data`.
#[derive(Deserialize, Debug, Clone)]
pub struct PriceResponse {
    pub symbol: Symbol,
    #[serde(deserialize_with = "decimal_lenient::deserialize")]
    pub price: Decimal,
    /// 24h change in percent.
    #[serde(
        default,
        alias = "change_percent",
        deserialize_with = "decimal_lenient::deserialize"
    )]
    pub change: Decimal,
}
