//! Price domain: live ticker quotes.

pub mod client;
pub mod wire;

use crate::cache::CacheKey;
use crate::error::FetchError;
use crate::fallback::FallbackPolicy;
use crate::shared::Symbol;
use crate::source::{decode_json, Decode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest quote for one symbol. The whole list is replaced on every poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub symbol: Symbol,
    pub price: Decimal,
    pub change_percent_24h: Decimal,
    pub sampled_at: DateTime<Utc>,
}

impl PricePoint {
    /// Zeroed quote, used as the ticker placeholder.
    pub fn placeholder(symbol: Symbol) -> Self {
        Self {
            symbol,
            price: Decimal::ZERO,
            change_percent_24h: Decimal::ZERO,
            sampled_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn is_up(&self) -> bool {
        self.change_percent_24h >= Decimal::ZERO
    }
}

impl Decode for Vec<PricePoint> {
    fn decode(payload: serde_json::Value) -> Result<Self, FetchError> {
        let rows: Vec<wire::PriceResponse> = decode_json(payload)?;
        let sampled_at = Utc::now();
        Ok(rows
            .into_iter()
            .map(|r| PricePoint {
                symbol: r.symbol,
                price: r.price,
                change_percent_24h: r.change,
                sampled_at,
            })
            .collect())
    }
}

/// Look up a symbol (case-insensitive) in a ticker list.
pub fn find<'a>(points: &'a [PricePoint], symbol: &str) -> Option<&'a PricePoint> {
    points.iter().find(|p| p.symbol.eq_ignore_case(symbol))
}

/// Zero price/change entries for a fixed symbol set.
#[derive(Debug, Clone)]
pub struct TickerFallback {
    symbols: Vec<Symbol>,
}

impl TickerFallback {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }
}

impl FallbackPolicy<Vec<PricePoint>> for TickerFallback {
    fn fallback(&self, _key: &CacheKey) -> Vec<PricePoint> {
        self.symbols
            .iter()
            .cloned()
            .map(PricePoint::placeholder)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Endpoint;
    use serde_json::json;

    #[test]
    fn test_decode_accepts_numbers_and_strings() {
        let points = Vec::<PricePoint>::decode(json!([
            {"symbol": "BTCUSDT", "price": 64250.5, "change": -1.25},
            {"symbol": "ETHUSDT", "price": "3120.10", "change": "2.4"}
        ]))
        .unwrap();
        assert_eq!(points.len(), 2);
        assert!(!points[0].is_up());
        assert_eq!(find(&points, "ethusdt").unwrap().price, Decimal::new(312010, 2));
    }

    #[test]
    fn test_decode_rejects_missing_price() {
        let err = Vec::<PricePoint>::decode(json!([{"symbol": "BTCUSDT"}])).unwrap_err();
        assert!(matches!(err, FetchError::Schema(_)));
    }

    #[test]
    fn test_ticker_fallback_shape() {
        let fallback = TickerFallback::new(vec!["BTCUSDT".into(), "ETHUSDT".into(), "SOLUSDT".into()]);
        let points = fallback.fallback(&CacheKey::new(Endpoint::CryptoLiveData));
        assert_eq!(points.len(), 3);
        assert!(points
            .iter()
            .all(|p| p.price.is_zero() && p.change_percent_24h.is_zero()));
        assert_eq!(points[2].symbol.as_str(), "SOLUSDT");
    }
}
