//! High-level client: `DashboardClient` with nested sub-client accessors.
//!
//! Each domain has its own sub-client in `domain/<name>/client.rs`.
//! This module keeps the builder, the shared caches, and the session.

use crate::cache::{CacheStore, PollingScheduler};
use crate::config::SyncConfig;
use crate::domain::history::client::History;
use crate::domain::notification::client::Notifications;
use crate::domain::notification::Notification;
use crate::domain::price::client::Prices;
use crate::domain::price::{PricePoint, TickerFallback};
use crate::domain::role::client::Roles;
use crate::domain::role::{NoRole, UserRole};
use crate::domain::strategy::client::Strategies;
use crate::domain::strategy::DeployedStrategy;
use crate::error::SyncError;
use crate::fallback::DefaultFallback;
use crate::session::{Session, Theme, UserIdentity};
use crate::source::RemoteDataSource;

use std::sync::Arc;
use std::time::Duration;

// Re-export sub-client types for convenience.
pub use crate::domain::history::client::History as HistoryClient;
pub use crate::domain::notification::client::Notifications as NotificationsClient;
pub use crate::domain::price::client::Prices as PricesClient;
pub use crate::domain::role::client::Roles as RolesClient;
pub use crate::domain::strategy::client::Strategies as StrategiesClient;

/// The primary entry point for dashboard widgets.
///
/// Provides nested sub-client accessors for each domain:
/// `client.notifications()`, `client.prices()`, etc. Clones share caches,
/// timers and session.
pub struct DashboardClient {
    pub(crate) source: Arc<dyn RemoteDataSource>,
    pub(crate) config: Arc<SyncConfig>,
    pub(crate) session: Session,
    pub(crate) platform: String,
    pub(crate) notifications: PollingScheduler<Vec<Notification>>,
    pub(crate) prices: PollingScheduler<Vec<PricePoint>>,
    pub(crate) strategies: PollingScheduler<Vec<DeployedStrategy>>,
    pub(crate) roles: PollingScheduler<UserRole>,
}

impl DashboardClient {
    pub fn builder() -> DashboardClientBuilder {
        DashboardClientBuilder::default()
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn notifications(&self) -> Notifications<'_> {
        Notifications { client: self }
    }

    pub fn prices(&self) -> Prices<'_> {
        Prices { client: self }
    }

    pub fn history(&self) -> History<'_> {
        History { client: self }
    }

    pub fn strategies(&self) -> Strategies<'_> {
        Strategies { client: self }
    }

    pub fn roles(&self) -> Roles<'_> {
        Roles { client: self }
    }

    // ── Session ──────────────────────────────────────────────────────────

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn source(&self) -> Arc<dyn RemoteDataSource> {
        Arc::clone(&self.source)
    }

    /// Record the identity supplied by the auth layer, on this client's platform.
    pub async fn sign_in(&self, email: &str, user_type: &str) {
        let identity = UserIdentity::new(email, user_type).with_platform(self.platform.as_str());
        self.session.sign_in(identity).await;
    }

    /// Forget the identity and drop every cached value and polling timer.
    /// Open subscriptions observe their entries closing.
    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        self.clear_all_caches();
    }

    /// Stop all polling and clear every cache.
    pub fn clear_all_caches(&self) {
        self.notifications.shutdown();
        self.prices.shutdown();
        self.strategies.shutdown();
        self.roles.shutdown();
    }
}

impl Clone for DashboardClient {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            config: self.config.clone(),
            session: self.session.clone(),
            platform: self.platform.clone(),
            notifications: self.notifications.clone(),
            prices: self.prices.clone(),
            strategies: self.strategies.clone(),
            roles: self.roles.clone(),
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct DashboardClientBuilder {
    base_url: String,
    platform: String,
    config: SyncConfig,
    source: Option<Arc<dyn RemoteDataSource>>,
    session: Option<Session>,
}

impl Default for DashboardClientBuilder {
    fn default() -> Self {
        Self {
            base_url: crate::network::DEFAULT_API_URL.to_string(),
            platform: crate::network::DEFAULT_PLATFORM.to_string(),
            config: SyncConfig::default(),
            source: None,
            session: None,
        }
    }
}

impl DashboardClientBuilder {
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn platform(mut self, platform: &str) -> Self {
        self.platform = platform.to_string();
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Use a custom data source instead of the HTTP transport.
    pub fn source(mut self, source: Arc<dyn RemoteDataSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Share an existing session (e.g. one initialized with a persisted theme).
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn build(self) -> Result<DashboardClient, SyncError> {
        self.config.validate()?;
        let source = match self.source {
            Some(source) => source,
            None => default_source(&self.base_url, self.config.request_timeout)?,
        };
        let timeout = self.config.request_timeout;
        let ticker_fallback = TickerFallback::new(self.config.ticker_fallback_symbols.clone());

        Ok(DashboardClient {
            notifications: PollingScheduler::new(CacheStore::new(
                source.clone(),
                Arc::new(DefaultFallback),
                timeout,
            )),
            prices: PollingScheduler::new(CacheStore::new(
                source.clone(),
                Arc::new(ticker_fallback),
                timeout,
            )),
            strategies: PollingScheduler::new(CacheStore::new(
                source.clone(),
                Arc::new(DefaultFallback),
                timeout,
            )),
            roles: PollingScheduler::new(CacheStore::new(source.clone(), Arc::new(NoRole), timeout)),
            source,
            config: Arc::new(self.config),
            session: self
                .session
                .unwrap_or_else(|| Session::init(None, Theme::default())),
            platform: self.platform,
        })
    }
}

#[cfg(feature = "http")]
fn default_source(base_url: &str, timeout: Duration) -> Result<Arc<dyn RemoteDataSource>, SyncError> {
    Ok(Arc::new(crate::http::DashboardHttp::new(base_url, timeout)?))
}

#[cfg(not(feature = "http"))]
fn default_source(_base_url: &str, _timeout: Duration) -> Result<Arc<dyn RemoteDataSource>, SyncError> {
    Err(SyncError::Config(
        "no data source: enable the `http` feature or call `DashboardClientBuilder::source`".into(),
    ))
}
