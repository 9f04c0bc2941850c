//! Roles sub-client: role lookup by email.

use crate::cache::{CacheKey, Subscription};
use crate::client::DashboardClient;
use crate::domain::role::UserRole;
use crate::error::SyncError;
use crate::source::Endpoint;

pub struct Roles<'a> {
    pub(crate) client: &'a DashboardClient,
}

impl<'a> Roles<'a> {
    pub fn key(email: &str) -> CacheKey {
        CacheKey::new(Endpoint::Role).param("email", email)
    }

    pub fn subscribe(&self, email: &str) -> Subscription<UserRole> {
        self.client
            .roles
            .subscribe(Self::key(email), self.client.config.role.clone())
    }

    /// Role of `email`, cached for the configured stale time.
    pub async fn get(&self, email: &str) -> Result<UserRole, SyncError> {
        self.client
            .roles
            .get(Self::key(email), self.client.config.role.clone())
            .await
    }

    /// Role of the signed-in user.
    pub async fn current(&self) -> Result<UserRole, SyncError> {
        let identity = self.client.session.require_identity().await?;
        self.get(&identity.email).await
    }
}
