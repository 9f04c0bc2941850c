//! # dashsync
//!
//! Client-side live data synchronization for the trading dashboard: one
//! shared layer for polling, staleness, optimistic mutation, fallback values
//! and pagination, used by every widget.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core**: Shared types, errors, configuration, `RemoteDataSource`
//! 2. **Sync**: `CacheStore` + `PollingScheduler`, fallback policies,
//!    optimistic mutations, pagination cursors
//! 3. **Domains**: Notifications, prices, trade history, strategies, roles
//! 4. **HTTP**: `DashboardHttp` transport (feature `http`)
//! 5. **High-Level Client**: `DashboardClient` with nested sub-clients
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dashsync::prelude::*;
//!
//! let client = DashboardClient::builder()
//!     .base_url("http://localhost:8000")
//!     .build()?;
//! client.sign_in("trader@example.com", "client").await;
//!
//! let mut ticker = client.prices().subscribe();
//! while let Some(entry) = ticker.changed().await {
//!     render(entry.value.unwrap_or_default());
//! }
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes and serde helpers.
pub mod shared;

/// Error types.
pub mod error;

/// Network constants.
pub mod network;

/// Per-key and per-client configuration.
pub mod config;

/// Request model and the `RemoteDataSource` trait.
pub mod source;

/// Theme and signed-in identity.
pub mod session;

// ── Layer 2: Sync ────────────────────────────────────────────────────────────

/// Keyed cache, subscriptions and polling.
pub mod cache;

/// Default payloads for failed first fetches.
pub mod fallback;

/// Optimistic local mutations with remote confirmation.
pub mod mutation;

/// Server-driven page traversal.
pub mod pagination;

// ── Layer 3: Domains ─────────────────────────────────────────────────────────

/// Domain modules (vertical slices): types, wire types, conversions, state.
pub mod domain;

// ── Layer 4: HTTP ────────────────────────────────────────────────────────────

/// `DashboardHttp`, the reqwest-backed `RemoteDataSource`.
#[cfg(feature = "http")]
pub mod http;

// ── Layer 5: High-Level Client ───────────────────────────────────────────────

/// `DashboardClient`, the primary entry point.
pub mod client;

#[cfg(test)]
mod test_support;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{NotificationId, Side, Symbol};

    // Sync layer
    pub use crate::cache::{
        CacheEntry, CacheKey, CacheStore, EntryStatus, PollingScheduler, RetryConfig, RetryPolicy,
        Subscription, ValueOrigin,
    };
    pub use crate::config::{KeyConfig, SyncConfig};
    pub use crate::fallback::{DefaultFallback, FallbackPolicy, FnFallback, StaticFallback};
    pub use crate::mutation::{
        MutationOutcome, MutationSink, MutationTicket, OptimisticMutationCoordinator,
        OptimisticState, ReconcilePolicy,
    };
    pub use crate::pagination::{Page, PageCursor, PageSource, PageState, PaginationCursor};
    pub use crate::source::{Endpoint, Method, RemoteDataSource, Request};

    // Domain types
    pub use crate::domain::history::{HistoryCursor, TradeFilter, TradeRecord, TradeState};
    pub use crate::domain::notification::{
        Notification, NotificationFeed, NotificationIntent, NotificationKind, NotificationSet,
    };
    pub use crate::domain::price::{PricePoint, TickerFallback};
    pub use crate::domain::role::UserRole;
    pub use crate::domain::strategy::DeployedStrategy;

    // Session
    pub use crate::session::{Session, Theme, UserIdentity};

    // Errors
    pub use crate::error::{FetchError, SyncError};

    // Network
    pub use crate::network::{DEFAULT_API_URL, DEFAULT_PLATFORM};

    // Client + sub-clients
    pub use crate::client::{
        DashboardClient, DashboardClientBuilder, HistoryClient, NotificationsClient,
        PricesClient, RolesClient, StrategiesClient,
    };
    #[cfg(feature = "http")]
    pub use crate::http::DashboardHttp;
}
