//! Strategy domain: strategies the user has deployed.

pub mod client;

use crate::error::FetchError;
use crate::shared::serde_util;
use crate::shared::Symbol;
use crate::source::{decode_json, Decode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A deployed strategy.
///
/// Only the fields the dashboard renders are typed; everything else the
/// backend sends is kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeployedStrategy {
    #[serde(alias = "_id", alias = "strategy_id", deserialize_with = "serde_util::string_or_number")]
    pub id: String,
    #[serde(default, alias = "strategy_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<Symbol>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "created_at", deserialize_with = "opt_timestamp")]
    pub deployed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeployedStrategy {
    pub fn is_running(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("running") || s.eq_ignore_ascii_case("active"))
    }
}

fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        other => serde_util::timestamp_lenient::deserialize(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl Decode for Vec<DeployedStrategy> {
    fn decode(payload: Value) -> Result<Self, FetchError> {
        // Some deployments wrap the list as `{"data": [...]}` or `{"strategies": [...]}`.
        let payload = match payload {
            Value::Object(mut obj) if !obj.contains_key("id") => obj
                .remove("data")
                .or_else(|| obj.remove("strategies"))
                .unwrap_or(Value::Object(obj)),
            other => other,
        };
        decode_json(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_keeps_unknown_fields() {
        let list = Vec::<DeployedStrategy>::decode(json!([
            {
                "id": 7,
                "name": "Grid BTC",
                "symbol": "BTCUSDT",
                "status": "running",
                "deployed_at": "2024-05-01T09:00:00Z",
                "leverage": 3,
                "grid_levels": [1, 2, 3]
            }
        ]))
        .unwrap();
        let s = &list[0];
        assert_eq!(s.id, "7");
        assert!(s.is_running());
        assert!(s.deployed_at.is_some());
        assert_eq!(s.extra["leverage"], json!(3));
        assert_eq!(s.extra.len(), 2);
    }

    #[test]
    fn test_decode_wrapped_and_minimal() {
        let list = Vec::<DeployedStrategy>::decode(json!({
            "data": [{"strategy_id": "abc", "created_at": null}]
        }))
        .unwrap();
        assert_eq!(list[0].id, "abc");
        assert!(list[0].name.is_none());
        assert!(!list[0].is_running());
    }

    #[test]
    fn test_decode_rejects_missing_id() {
        let err = Vec::<DeployedStrategy>::decode(json!([{"name": "x"}])).unwrap_err();
        assert!(matches!(err, FetchError::Schema(_)));
    }
}
