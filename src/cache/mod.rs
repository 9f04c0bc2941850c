//! Keyed cache of remote values with stale-while-revalidate reads,
//! subscription-scoped polling, and generation-guarded writes.

pub mod entry;
pub mod key;
pub mod retry;
pub mod scheduler;
pub mod store;

pub use entry::{CacheEntry, EntryStatus, ValueOrigin};
pub use key::CacheKey;
pub use retry::{RetryConfig, RetryPolicy};
pub use scheduler::{PollingScheduler, Subscription};
pub use store::CacheStore;
