//! Fallback payloads for keys whose first fetch failed.
//!
//! Consulted only when a fetch fails and the entry has never held a value,
//! so dependent code always has something render-safe.

use crate::cache::CacheKey;

/// Supplies the default value for a key.
pub trait FallbackPolicy<T>: Send + Sync {
    fn fallback(&self, key: &CacheKey) -> T;
}

/// Falls back to `T::default()` (empty lists, zeroed records).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFallback;

impl<T: Default> FallbackPolicy<T> for DefaultFallback {
    fn fallback(&self, _key: &CacheKey) -> T {
        T::default()
    }
}

/// Falls back to a fixed payload.
#[derive(Debug, Clone)]
pub struct StaticFallback<T>(pub T);

impl<T: Clone + Send + Sync> FallbackPolicy<T> for StaticFallback<T> {
    fn fallback(&self, _key: &CacheKey) -> T {
        self.0.clone()
    }
}

/// Computes the payload from the key.
pub struct FnFallback<F>(pub F);

impl<T, F> FallbackPolicy<T> for FnFallback<F>
where
    F: Fn(&CacheKey) -> T + Send + Sync,
{
    fn fallback(&self, key: &CacheKey) -> T {
        (self.0)(key)
    }
}
