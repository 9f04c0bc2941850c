//! Notifications sub-client: live feed with optimistic read/dismiss.

use std::sync::Arc;

use crate::cache::CacheKey;
use crate::client::DashboardClient;
use crate::domain::notification::{Notification, NotificationFeed, NotificationSink};
use crate::error::SyncError;
use crate::session::UserIdentity;
use crate::source::{fetch_typed, Endpoint};

pub struct Notifications<'a> {
    pub(crate) client: &'a DashboardClient,
}

impl<'a> Notifications<'a> {
    /// Cache key of one user's notification list.
    pub fn key(identity: &UserIdentity) -> CacheKey {
        CacheKey::new(Endpoint::Notifications)
            .param("platform", &identity.platform)
            .param("user_type", &identity.user_type)
            .param("user_email", &identity.email)
    }

    /// Subscribe to the signed-in user's notifications, polled at the
    /// configured cadence.
    pub async fn subscribe(&self) -> Result<NotificationFeed, SyncError> {
        let identity = self.client.session.require_identity().await?;
        let subscription = self
            .client
            .notifications
            .subscribe(Self::key(&identity), self.client.config.notifications.clone());
        let sink = Arc::new(NotificationSink::new(
            self.client.source.clone(),
            identity.email,
        ));
        Ok(NotificationFeed::new(
            subscription,
            sink,
            self.client.config.reconcile_policy,
        ))
    }

    /// One-off fetch that bypasses the cache.
    pub async fn fetch(&self) -> Result<Vec<Notification>, SyncError> {
        let identity = self.client.session.require_identity().await?;
        let request = Self::key(&identity).request();
        Ok(fetch_typed(self.client.source.as_ref(), request).await?)
    }
}
