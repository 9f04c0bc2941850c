//! Strategies sub-client: the user's deployed strategies.

use crate::cache::{CacheKey, Subscription};
use crate::client::DashboardClient;
use crate::domain::strategy::DeployedStrategy;
use crate::error::SyncError;
use crate::source::Endpoint;

pub struct Strategies<'a> {
    pub(crate) client: &'a DashboardClient,
}

impl<'a> Strategies<'a> {
    pub fn key(email: &str) -> CacheKey {
        CacheKey::new(Endpoint::DeployedStrategies).param("email", email)
    }

    pub async fn subscribe(&self) -> Result<Subscription<Vec<DeployedStrategy>>, SyncError> {
        let identity = self.client.session.require_identity().await?;
        Ok(self.client.strategies.subscribe(
            Self::key(&identity.email),
            self.client.config.strategies.clone(),
        ))
    }

    pub async fn get(&self) -> Result<Vec<DeployedStrategy>, SyncError> {
        let identity = self.client.session.require_identity().await?;
        self.client
            .strategies
            .get(
                Self::key(&identity.email),
                self.client.config.strategies.clone(),
            )
            .await
    }

    /// Mark the cached list stale, e.g. after deploying a new strategy.
    pub async fn invalidate(&self) -> Result<(), SyncError> {
        let identity = self.client.session.require_identity().await?;
        self.client
            .strategies
            .store()
            .invalidate(&Self::key(&identity.email));
        Ok(())
    }
}
