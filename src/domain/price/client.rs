//! Prices sub-client: the live ticker.

use crate::cache::{CacheKey, Subscription};
use crate::client::DashboardClient;
use crate::domain::price::PricePoint;
use crate::error::SyncError;
use crate::source::Endpoint;

pub struct Prices<'a> {
    pub(crate) client: &'a DashboardClient,
}

impl<'a> Prices<'a> {
    pub fn key() -> CacheKey {
        CacheKey::new(Endpoint::CryptoLiveData)
    }

    /// Subscribe to the ticker. Shows zeroed placeholders for the configured
    /// symbols until the first successful poll.
    pub fn subscribe(&self) -> Subscription<Vec<PricePoint>> {
        self.client
            .prices
            .subscribe(Self::key(), self.client.config.prices.clone())
    }

    /// Current quotes, served from cache when fresh. Does not poll.
    pub async fn get(&self) -> Result<Vec<PricePoint>, SyncError> {
        self.client
            .prices
            .get(Self::key(), self.client.config.prices.clone())
            .await
    }
}
