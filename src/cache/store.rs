//! `CacheStore`: per-key last-known values with generation-stamped revalidation.
//!
//! The store is the only writer of [`CacheEntry`] values. Each key's entry
//! lives inside a `watch` channel, so subscribers read cheap snapshots and are
//! woken on every change. Every issued fetch bumps the key's generation; a
//! response is applied only when its generation is still the current one
//! (last-issued-wins), and releasing the last subscriber bumps it once more so
//! nothing lands after teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::entry::{CacheEntry, EntryStatus, ValueOrigin};
use super::retry::RetryPolicy;
use super::CacheKey;
use crate::config::KeyConfig;
use crate::error::{FetchError, SyncError};
use crate::fallback::FallbackPolicy;
use crate::source::{Decode, RemoteDataSource};

struct Slot<T> {
    tx: watch::Sender<CacheEntry<T>>,
    /// Distinguishes this slot from earlier ones under the same key.
    epoch: u64,
    config: KeyConfig,
    subscribers: usize,
    orphaned_at: Option<Instant>,
}

impl<T> Slot<T> {
    fn new(key: CacheKey, config: KeyConfig, epoch: u64) -> Self {
        let (tx, _) = watch::channel(CacheEntry::empty(key));
        Self {
            tx,
            epoch,
            config,
            subscribers: 0,
            orphaned_at: None,
        }
    }

    /// Bump the generation and flag the entry as loading. Returns the new generation.
    fn begin_fetch(&self) -> u64 {
        let now = Instant::now();
        self.tx.send_modify(|entry| {
            entry.generation += 1;
            entry.status = EntryStatus::Loading;
            entry.issued_at = Some(now);
        });
        self.tx.borrow().generation
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.subscribers == 0
            && self
                .orphaned_at
                .is_some_and(|at| now.saturating_duration_since(at) >= self.config.gc_time)
    }
}

struct Inner<T> {
    source: Arc<dyn RemoteDataSource>,
    fallback: Arc<dyn FallbackPolicy<T>>,
    request_timeout: Duration,
    slots: Mutex<HashMap<CacheKey, Slot<T>>>,
    next_epoch: AtomicU64,
}

/// Shared cache of remote values of type `T`.
///
/// Cheap to clone; clones share the same entries.
pub struct CacheStore<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for CacheStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> CacheStore<T>
where
    T: Decode + Clone + Send + Sync + 'static,
{
    pub fn new(
        source: Arc<dyn RemoteDataSource>,
        fallback: Arc<dyn FallbackPolicy<T>>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                fallback,
                request_timeout,
                slots: Mutex::new(HashMap::new()),
                next_epoch: AtomicU64::new(1),
            }),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<CacheKey, Slot<T>>> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Current snapshot of an entry, if the key is cached.
    pub fn snapshot(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        self.slots().get(key).map(|slot| slot.tx.borrow().clone())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.slots().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    pub fn subscriber_count(&self, key: &CacheKey) -> usize {
        self.slots().get(key).map_or(0, |slot| slot.subscribers)
    }

    // ── Subscriber bookkeeping ───────────────────────────────────────────

    /// Register a subscriber for `key`, creating the entry on first use.
    ///
    /// Returns a receiver positioned at the current entry, the generation of
    /// a fetch the caller must run when the entry is neither fresh under
    /// `config.stale_time` nor already loading, and the slot's epoch. The
    /// epoch must be handed back to [`release`](Self::release).
    pub(crate) fn acquire(
        &self,
        key: &CacheKey,
        config: &KeyConfig,
    ) -> (watch::Receiver<CacheEntry<T>>, Option<u64>, u64) {
        let now = Instant::now();
        let mut slots = self.slots();
        sweep(&mut slots, now);

        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| {
                let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);
                Slot::new(key.clone(), config.clone(), epoch)
            });

        if slot.subscribers == 0 {
            slot.config = config.clone();
        } else {
            slot.config.retry_count = slot.config.retry_count.max(config.retry_count);
            slot.config.gc_time = slot.config.gc_time.max(config.gc_time);
        }
        slot.subscribers += 1;
        slot.orphaned_at = None;

        let needs_fetch = {
            let entry = slot.tx.borrow();
            !entry.is_loading() && !entry.is_fresh(config.stale_time, now)
        };
        let generation = needs_fetch.then(|| slot.begin_fetch());
        // Subscribe after flagging the fetch so the receiver starts at the
        // loading snapshot instead of being woken by it.
        (slot.tx.subscribe(), generation, slot.epoch)
    }

    /// Drop one subscriber. The last one out invalidates in-flight fetches and
    /// starts the entry's gc countdown.
    ///
    /// A release carrying the epoch of a slot that has since been cleared is
    /// ignored, so it cannot touch a newer slot under the same key.
    pub(crate) fn release(&self, key: &CacheKey, epoch: u64) {
        let now = Instant::now();
        let mut slots = self.slots();
        if let Some(slot) = slots.get_mut(key).filter(|slot| slot.epoch == epoch) {
            slot.subscribers = slot.subscribers.saturating_sub(1);
            if slot.subscribers == 0 {
                slot.orphaned_at = Some(now);
                slot.tx.send_modify(|entry| {
                    entry.generation += 1;
                    if entry.status == EntryStatus::Loading {
                        entry.status = EntryStatus::Stale;
                    }
                });
                tracing::debug!(key = %key, "Last subscriber released");
            }
        }
        sweep(&mut slots, now);
    }

    // ── Writes ───────────────────────────────────────────────────────────

    /// Start a fetch for `key`. `None` when the key is not cached.
    pub(crate) fn begin_fetch(&self, key: &CacheKey) -> Option<u64> {
        self.slots().get(key).map(|slot| slot.begin_fetch())
    }

    /// Start a fetch for `key` only while the slot of `epoch` is still live.
    pub(crate) fn begin_fetch_in(&self, key: &CacheKey, epoch: u64) -> Option<u64> {
        self.slots()
            .get(key)
            .filter(|slot| slot.epoch == epoch)
            .map(|slot| slot.begin_fetch())
    }

    /// Apply a fetch result if `generation` is still current.
    ///
    /// Superseded (or evicted) results come back as
    /// [`SyncError::StaleResponse`] and leave the entry untouched.
    pub(crate) fn apply(
        &self,
        key: &CacheKey,
        generation: u64,
        result: Result<T, FetchError>,
    ) -> Result<(), SyncError> {
        let slots = self.slots();
        let Some(slot) = slots.get(key) else {
            return Err(SyncError::StaleResponse {
                key: key.clone(),
                generation,
                current: 0,
            });
        };

        let current = slot.tx.borrow().generation;
        if current != generation {
            return Err(SyncError::StaleResponse {
                key: key.clone(),
                generation,
                current,
            });
        }

        match result {
            Ok(value) => {
                let now = Instant::now();
                slot.tx.send_modify(|entry| {
                    entry.value = Some(value);
                    entry.fetched_at = Some(now);
                    entry.requested_at = entry.issued_at;
                    entry.status = EntryStatus::Fresh;
                    entry.origin = ValueOrigin::Remote;
                    entry.last_error = None;
                });
            }
            Err(err) => {
                let fallback = slot
                    .tx
                    .borrow()
                    .value
                    .is_none()
                    .then(|| self.inner.fallback.fallback(key));
                tracing::warn!(
                    key = %key,
                    generation,
                    fallback = fallback.is_some(),
                    "Fetch failed: {}",
                    err
                );
                slot.tx.send_modify(|entry| {
                    entry.status = EntryStatus::Errored;
                    entry.last_error = Some(err);
                    if let Some(value) = fallback {
                        entry.value = Some(value);
                        entry.origin = ValueOrigin::Fallback;
                    }
                });
            }
        }
        Ok(())
    }

    /// Mark an entry stale so the next subscribe refetches.
    pub fn invalidate(&self, key: &CacheKey) {
        if let Some(slot) = self.slots().get(key) {
            slot.tx.send_if_modified(|entry| {
                if entry.status == EntryStatus::Fresh {
                    entry.status = EntryStatus::Stale;
                    true
                } else {
                    false
                }
            });
        }
    }

    /// Drop every entry. Open subscriptions observe their channel closing and
    /// in-flight responses are discarded.
    pub fn clear(&self) {
        let mut slots = self.slots();
        let count = slots.len();
        slots.clear();
        if count > 0 {
            tracing::info!("Cleared {} cache entr(ies)", count);
        }
    }

    // ── Fetching ─────────────────────────────────────────────────────────

    /// Force a revalidation of `key` and wait for it.
    ///
    /// Returns `StaleResponse` when a later fetch overtook this one.
    pub async fn revalidate(&self, key: &CacheKey) -> Result<(), SyncError> {
        let Some(generation) = self.begin_fetch(key) else {
            tracing::debug!(key = %key, "Revalidate skipped: key not cached");
            return Ok(());
        };
        let result = self.fetch_with_retry(key, generation).await;
        self.apply(key, generation, result)
    }

    /// Run the fetch for an already-issued generation. Spawned by the scheduler.
    pub(crate) async fn run_fetch(self, key: CacheKey, generation: u64) {
        let result = self.fetch_with_retry(&key, generation).await;
        if let Err(e) = self.apply(&key, generation, result) {
            tracing::debug!("Discarding response: {}", e);
        }
    }

    fn is_current(&self, key: &CacheKey, generation: u64) -> bool {
        self.slots()
            .get(key)
            .is_some_and(|slot| slot.tx.borrow().generation == generation)
    }

    async fn fetch_with_retry(&self, key: &CacheKey, generation: u64) -> Result<T, FetchError> {
        let retry_count = self
            .slots()
            .get(key)
            .map_or(0, |slot| slot.config.retry_count);
        let retry = RetryPolicy::for_key(retry_count);

        let mut attempt = 0;
        loop {
            let err = match self.fetch_once(key).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            let Some(config) = retry.config() else {
                return Err(err);
            };
            // A superseded fetch is not worth another attempt.
            if attempt >= config.max_retries
                || !config.should_retry(&err)
                || !self.is_current(key, generation)
            {
                return Err(err);
            }

            let delay = config.backoff(attempt);
            tracing::debug!(
                key = %key,
                attempt = attempt + 1,
                max = config.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Retrying after: {}",
                err
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn fetch_once(&self, key: &CacheKey) -> Result<T, FetchError> {
        let payload = tokio::time::timeout(
            self.inner.request_timeout,
            self.inner.source.fetch(key.request()),
        )
        .await
        .map_err(|_| FetchError::timeout())??;
        T::decode(payload)
    }
}

fn sweep<T>(slots: &mut HashMap<CacheKey, Slot<T>>, now: Instant) {
    slots.retain(|key, slot| {
        let expired = slot.is_expired(now);
        if expired {
            tracing::debug!(key = %key, "Evicting unused cache entry");
        }
        !expired
    });
}
