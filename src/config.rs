//! Synchronization configuration: per-key polling/staleness settings plus
//! the per-domain defaults the dashboard widgets run with.
//!
//! Every cadence is data, not a constant: load a [`SyncConfig`] from JSON or
//! adjust it through `DashboardClientBuilder`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SyncError;
use crate::mutation::ReconcilePolicy;
use crate::shared::serde_util::duration_ms;
use crate::shared::Symbol;

/// Polling and staleness settings for one cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Refetch period while at least one subscriber is alive. `None` disables polling.
    #[serde(default, with = "opt_duration_ms")]
    pub interval: Option<Duration>,
    /// How long a fetched value is served without a new network call.
    #[serde(with = "duration_ms")]
    pub stale_time: Duration,
    /// Extra attempts per revalidation on retryable failures.
    #[serde(default)]
    pub retry_count: u32,
    /// How long an entry outlives its last subscriber before eviction.
    #[serde(default = "default_gc_time", with = "duration_ms")]
    pub gc_time: Duration,
}

fn default_gc_time() -> Duration {
    Duration::from_secs(300)
}

impl KeyConfig {
    /// Polled every `interval`; the value goes stale after one interval.
    pub fn polling(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            stale_time: interval,
            retry_count: 1,
            gc_time: default_gc_time(),
        }
    }

    /// Fetched on subscribe and on explicit refresh only.
    pub fn on_demand(stale_time: Duration) -> Self {
        Self {
            interval: None,
            stale_time,
            retry_count: 1,
            gc_time: default_gc_time(),
        }
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if let Some(interval) = self.interval {
            if interval.is_zero() {
                return Err(SyncError::Config("polling interval must be > 0".into()));
            }
        }
        Ok(())
    }
}

/// Whole-client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound for a single remote call.
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
    pub notifications: KeyConfig,
    pub prices: KeyConfig,
    pub strategies: KeyConfig,
    pub role: KeyConfig,
    pub history_page_size: u32,
    /// Symbols shown with zero values when the ticker has never loaded.
    pub ticker_fallback_symbols: Vec<Symbol>,
    pub reconcile_policy: ReconcilePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            notifications: KeyConfig::polling(Duration::from_secs(10)),
            prices: KeyConfig::polling(Duration::from_secs(15)),
            strategies: KeyConfig::polling(Duration::from_secs(2)),
            role: KeyConfig::on_demand(Duration::from_secs(300)),
            history_page_size: 20,
            ticker_fallback_symbols: vec![
                Symbol::from("BTCUSDT"),
                Symbol::from("ETHUSDT"),
                Symbol::from("SOLUSDT"),
            ],
            reconcile_policy: ReconcilePolicy::ForwardOnly,
        }
    }
}

impl SyncConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        let config: SyncConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.request_timeout.is_zero() {
            return Err(SyncError::Config("request_timeout must be > 0".into()));
        }
        if self.history_page_size == 0 {
            return Err(SyncError::Config("history_page_size must be > 0".into()));
        }
        self.notifications.validate()?;
        self.prices.validate()?;
        self.strategies.validate()?;
        self.role.validate()
    }
}

mod opt_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(d: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match d {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cadences() {
        let config = SyncConfig::default();
        assert_eq!(config.notifications.interval, Some(Duration::from_secs(10)));
        assert_eq!(config.prices.interval, Some(Duration::from_secs(15)));
        assert_eq!(config.strategies.interval, Some(Duration::from_secs(2)));
        assert_eq!(config.role.interval, None);
        assert_eq!(config.ticker_fallback_symbols.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial_override() {
        let config = SyncConfig::from_json(
            r#"{
                "request_timeout": 5000,
                "prices": { "interval": 30000, "stale_time": 20000, "retry_count": 2 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.prices.interval, Some(Duration::from_secs(30)));
        assert_eq!(config.prices.stale_time, Duration::from_secs(20));
        assert_eq!(config.prices.retry_count, 2);
        assert_eq!(config.prices.gc_time, Duration::from_secs(300));
        assert_eq!(config.notifications.interval, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = SyncConfig::from_json(
            r#"{ "strategies": { "interval": 0, "stale_time": 0 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
