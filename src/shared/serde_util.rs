//! Custom serde helpers for backend wire formats and configuration.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepts a JSON string or number and returns it as a string.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Same as [`string_or_number`] but `null` maps to `None`.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(D::Error::custom(format!(
            "expected string, number or null, got {}",
            other
        ))),
    }
}

/// Deserializes a `Decimal` from either a JSON number or a numeric string.
///
/// The price feed sends floats while the history endpoint sends strings.
pub mod decimal_lenient {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = string_or_number(deserializer)?;
        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map_err(|e| D::Error::custom(format!("Invalid decimal '{}': {}", raw, e)))
    }
}

/// Optional variant of [`decimal_lenient`]: `null`, a missing field or an
/// empty string map to `None`.
pub mod opt_decimal_lenient {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match opt_string_or_number(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .map(Some)
                .map_err(|e| D::Error::custom(format!("Invalid decimal '{}': {}", raw, e))),
        }
    }
}

/// Deserializes a timestamp given as ISO 8601 / RFC 3339 text or Unix millis.
pub mod timestamp_lenient {
    use super::*;
    use chrono::{DateTime, NaiveDateTime, Utc};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => {
                let millis = n
                    .as_i64()
                    .ok_or_else(|| D::Error::custom(format!("Invalid timestamp: {}", n)))?;
                DateTime::<Utc>::from_timestamp_millis(millis)
                    .ok_or_else(|| D::Error::custom(format!("Invalid timestamp: {}", millis)))
            }
            Value::String(s) => parse(&s).map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "expected timestamp, got {}",
                other
            ))),
        }
    }

    pub(crate) fn parse(s: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        // Naive timestamps from the backend are UTC.
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(naive.and_utc());
            }
        }
        Err(format!("Invalid timestamp: {}", s))
    }
}

/// Serializes a `Duration` as integer milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use rust_decimal::Decimal;
    use serde::Serialize;
    use std::time::Duration;

    #[derive(Deserialize)]
    struct Amount {
        #[serde(with = "decimal_lenient")]
        value: Decimal,
    }

    #[derive(Deserialize)]
    struct Stamp {
        #[serde(with = "timestamp_lenient")]
        at: chrono::DateTime<chrono::Utc>,
    }

    #[derive(Serialize, Deserialize)]
    struct Interval {
        #[serde(with = "duration_ms")]
        every: Duration,
    }

    #[test]
    fn test_decimal_from_number_and_string() {
        let a: Amount = serde_json::from_str(r#"{"value": 64250.5}"#).unwrap();
        let b: Amount = serde_json::from_str(r#"{"value": "64250.5"}"#).unwrap();
        assert_eq!(a.value, b.value);
        assert!(serde_json::from_str::<Amount>(r#"{"value": "abc"}"#).is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        let a: Stamp = serde_json::from_str(r#"{"at": "2024-03-01T12:30:00Z"}"#).unwrap();
        let b: Stamp = serde_json::from_str(r#"{"at": "2024-03-01T12:30:00.250"}"#).unwrap();
        let c: Stamp = serde_json::from_str(r#"{"at": 1709296200000}"#).unwrap();
        assert_eq!(a.at, c.at);
        assert_eq!(b.at.day(), 1);
        assert_eq!(b.at.minute(), 30);
    }

    #[test]
    fn test_duration_ms_roundtrip_shape() {
        let parsed: Interval = serde_json::from_str(r#"{"every": 10000}"#).unwrap();
        assert_eq!(parsed.every, Duration::from_secs(10));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#"{"every":10000}"#);
    }
}
