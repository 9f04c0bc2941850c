//! Cache entries and their status bookkeeping.

use std::time::Duration;
use tokio::time::Instant;

use super::CacheKey;
use crate::error::FetchError;

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Holds a value fetched within the staleness window.
    Fresh,
    /// Holds a value older than the staleness window (or invalidated).
    Stale,
    /// A fetch is in flight; `value` still shows the previous result.
    Loading,
    /// The latest fetch failed; `value` is the previous result or the fallback.
    Errored,
}

/// Where the current value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOrigin {
    /// Nothing has been stored yet.
    Empty,
    Remote,
    /// Supplied by the fallback policy after a failed first fetch.
    Fallback,
}

/// Last-known value for one key plus staleness bookkeeping.
///
/// Subscribers only ever see clones of this; the store is the sole writer.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: CacheKey,
    pub value: Option<T>,
    /// When `value` was last replaced by a successful fetch.
    pub fetched_at: Option<Instant>,
    /// When the fetch that produced `value` was issued.
    pub requested_at: Option<Instant>,
    /// When the most recent fetch was issued.
    pub issued_at: Option<Instant>,
    /// Monotonic per key. Bumped every time a fetch is issued.
    pub generation: u64,
    pub status: EntryStatus,
    pub origin: ValueOrigin,
    pub last_error: Option<FetchError>,
}

impl<T> CacheEntry<T> {
    pub(crate) fn empty(key: CacheKey) -> Self {
        Self {
            key,
            value: None,
            fetched_at: None,
            requested_at: None,
            issued_at: None,
            generation: 0,
            status: EntryStatus::Stale,
            origin: ValueOrigin::Empty,
            last_error: None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Time since the last successful fetch.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.fetched_at.map(|at| now.saturating_duration_since(at))
    }

    /// Whether the value can be served without a network call.
    pub fn is_fresh(&self, stale_time: Duration, now: Instant) -> bool {
        self.origin == ValueOrigin::Remote
            && self.status != EntryStatus::Stale
            && self.age(now).is_some_and(|age| age < stale_time)
    }

    pub fn is_loading(&self) -> bool {
        self.status == EntryStatus::Loading
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == ValueOrigin::Fallback
    }
}
