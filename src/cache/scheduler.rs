//! `PollingScheduler`: subscription-scoped refresh timers over a [`CacheStore`].
//!
//! A key's timer lives exactly as long as it has subscribers. When several
//! subscribers poll the same key at different cadences the shortest interval
//! drives the timer; it is recomputed whenever a subscriber leaves.
//!
//! Timers and subscriptions carry the epoch of the cache slot they were
//! created against. After [`PollingScheduler::shutdown`] a handle from the
//! old epoch releases nothing, even once the key has been subscribed again.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::Stream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::entry::{CacheEntry, ValueOrigin};
use super::store::CacheStore;
use super::CacheKey;
use crate::config::KeyConfig;
use crate::error::{FetchError, SyncError};
use crate::source::Decode;

struct Timer {
    epoch: u64,
    /// One element per live subscriber that asked for polling.
    intervals: Vec<Duration>,
    active: Duration,
    handle: JoinHandle<()>,
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Drives repeated refresh of cache entries while they have subscribers.
pub struct PollingScheduler<T> {
    store: CacheStore<T>,
    timers: Arc<Mutex<HashMap<CacheKey, Timer>>>,
}

impl<T> Clone for PollingScheduler<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            timers: Arc::clone(&self.timers),
        }
    }
}

impl<T> PollingScheduler<T>
where
    T: Decode + Clone + Send + Sync + 'static,
{
    pub fn new(store: CacheStore<T>) -> Self {
        Self {
            store,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &CacheStore<T> {
        &self.store
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<CacheKey, Timer>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to `key`.
    ///
    /// The returned handle holds the current entry immediately (possibly stale
    /// or still loading). A background fetch is issued when the entry is not
    /// fresh under `config.stale_time`, and the key is re-fetched every
    /// `config.interval` until the handle is unsubscribed or dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self, key: CacheKey, config: KeyConfig) -> Subscription<T> {
        let (rx, generation, epoch) = self.store.acquire(&key, &config);
        if let Some(generation) = generation {
            tokio::spawn(self.store.clone().run_fetch(key.clone(), generation));
        }
        if let Some(interval) = config.interval {
            self.add_interval(&key, interval, epoch);
        }
        tracing::debug!(key = %key, interval_ms = ?config.interval.map(|d| d.as_millis()), "Subscribed");

        Subscription {
            key,
            rx,
            scheduler: self.clone(),
            interval: config.interval,
            epoch,
            active: true,
        }
    }

    /// One-off read of `key` without registering a polling interval.
    ///
    /// Served from cache when fresh, otherwise joins or issues a fetch. Live
    /// subscribers of the key keep their timer untouched.
    pub async fn get(&self, key: CacheKey, config: KeyConfig) -> Result<T, SyncError> {
        let config = KeyConfig {
            interval: None,
            ..config
        };
        self.subscribe(key, config).resolve().await
    }

    /// Number of keys with a running timer.
    pub fn active_timers(&self) -> usize {
        self.timers().len()
    }

    /// The interval currently driving `key`'s timer.
    pub fn timer_interval(&self, key: &CacheKey) -> Option<Duration> {
        self.timers().get(key).map(|t| t.active)
    }

    /// Stop every timer and drop every cached entry.
    pub fn shutdown(&self) {
        self.timers().clear();
        self.store.clear();
    }

    fn add_interval(&self, key: &CacheKey, interval: Duration, epoch: u64) {
        let mut timers = self.timers();
        match timers.get_mut(key).filter(|timer| timer.epoch == epoch) {
            Some(timer) => {
                timer.intervals.push(interval);
                if interval < timer.active {
                    timer.handle.abort();
                    timer.handle = spawn_timer(self.store.clone(), key.clone(), interval);
                    timer.active = interval;
                }
            }
            None => {
                timers.insert(
                    key.clone(),
                    Timer {
                        epoch,
                        intervals: vec![interval],
                        active: interval,
                        handle: spawn_timer(self.store.clone(), key.clone(), interval),
                    },
                );
            }
        }
    }

    fn remove_interval(&self, key: &CacheKey, interval: Duration, epoch: u64) {
        let mut timers = self.timers();
        let Some(timer) = timers.get_mut(key).filter(|timer| timer.epoch == epoch) else {
            return;
        };
        if let Some(pos) = timer.intervals.iter().position(|i| *i == interval) {
            timer.intervals.swap_remove(pos);
        }
        match timer.intervals.iter().min().copied() {
            None => {
                timers.remove(key);
                tracing::debug!(key = %key, "Polling stopped");
            }
            Some(shortest) if shortest != timer.active => {
                timer.handle.abort();
                timer.handle = spawn_timer(self.store.clone(), key.clone(), shortest);
                timer.active = shortest;
            }
            Some(_) => {}
        }
    }

    fn unsubscribe(&self, key: &CacheKey, interval: Option<Duration>, epoch: u64) {
        if let Some(interval) = interval {
            self.remove_interval(key, interval, epoch);
        }
        self.store.release(key, epoch);
    }
}

fn spawn_timer<T>(store: CacheStore<T>, key: CacheKey, interval: Duration) -> JoinHandle<()>
where
    T: Decode + Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            // Ticks do not wait for the previous fetch; the generation guard
            // keeps only the newest response.
            match store.begin_fetch(&key) {
                Some(generation) => {
                    tokio::spawn(store.clone().run_fetch(key.clone(), generation));
                }
                None => return,
            }
        }
    })
}

/// A live subscription to one cache key.
///
/// Dropping the handle unsubscribes.
pub struct Subscription<T>
where
    T: Decode + Clone + Send + Sync + 'static,
{
    key: CacheKey,
    rx: watch::Receiver<CacheEntry<T>>,
    scheduler: PollingScheduler<T>,
    interval: Option<Duration>,
    epoch: u64,
    active: bool,
}

impl<T> Subscription<T>
where
    T: Decode + Clone + Send + Sync + 'static,
{
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Current entry snapshot.
    pub fn current(&self) -> CacheEntry<T> {
        self.rx.borrow().clone()
    }

    /// Current value, if any has been stored.
    pub fn value(&self) -> Option<T> {
        self.rx.borrow().value.clone()
    }

    /// Wait for the next change. `None` once the entry has been dropped from
    /// the cache (e.g. on sign-out).
    pub async fn changed(&mut self) -> Option<CacheEntry<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until no fetch is in flight. `None` once the entry has been dropped.
    pub async fn settled(&mut self) -> Option<CacheEntry<T>> {
        loop {
            let entry = self.rx.borrow_and_update().clone();
            if !entry.is_loading() {
                return Some(entry);
            }
            self.rx.changed().await.ok()?;
        }
    }

    /// Settle and hand back a remotely fetched value.
    ///
    /// A previously fetched value is served even when the latest revalidation
    /// failed; a fallback value is not, the fetch error is returned instead.
    pub async fn resolve(&mut self) -> Result<T, SyncError> {
        // Entries are only dropped wholesale on sign-out.
        let entry = self.settled().await.ok_or(SyncError::NotSignedIn)?;
        match entry.origin {
            ValueOrigin::Remote => entry.value.ok_or_else(|| {
                SyncError::Fetch(FetchError::Schema("entry marked remote without a value".into()))
            }),
            _ => Err(SyncError::Fetch(entry.last_error.unwrap_or_else(|| {
                FetchError::Network("no value fetched".into())
            }))),
        }
    }

    /// Stream of entry snapshots, one per change.
    pub fn updates(&mut self) -> Pin<Box<dyn Stream<Item = CacheEntry<T>> + Send + '_>> {
        Box::pin(async_stream::stream! {
            while let Some(entry) = self.changed().await {
                yield entry;
            }
        })
    }

    /// Manual retry: revalidate now, regardless of staleness.
    pub fn refresh(&self) {
        let store = self.scheduler.store.clone();
        if let Some(generation) = store.begin_fetch_in(&self.key, self.epoch) {
            tokio::spawn(store.run_fetch(self.key.clone(), generation));
        }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.active) {
            self.scheduler.unsubscribe(&self.key, self.interval, self.epoch);
        }
    }
}

impl<T> Drop for Subscription<T>
where
    T: Decode + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.release();
    }
}
