//! `NotificationFeed`: polled notifications merged with optimistic local edits.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio::time::Instant;

use super::state::{NotificationIntent, NotificationSet};
use super::Notification;
use crate::cache::{CacheEntry, EntryStatus, Subscription, ValueOrigin};
use crate::error::FetchError;
use crate::mutation::{
    MutationSink, MutationTicket, OptimisticMutationCoordinator, ReconcilePolicy,
};
use crate::shared::NotificationId;
use crate::source::{send_mutation, Endpoint, RemoteDataSource, Request};

/// Confirms read/dismiss mutations against the backend.
pub struct NotificationSink {
    source: Arc<dyn RemoteDataSource>,
    user_email: String,
}

impl NotificationSink {
    pub fn new(source: Arc<dyn RemoteDataSource>, user_email: impl Into<String>) -> Self {
        Self {
            source,
            user_email: user_email.into(),
        }
    }

    fn request(&self, id: &NotificationId, intent: NotificationIntent) -> Request {
        let endpoint = match intent {
            NotificationIntent::MarkRead => Endpoint::NotificationRead(id.clone()),
            NotificationIntent::Dismiss => Endpoint::NotificationDismiss(id.clone()),
        };
        Request::new(endpoint).param("user_email", &self.user_email)
    }
}

impl MutationSink<NotificationSet> for NotificationSink {
    fn confirm<'a>(
        &'a self,
        id: &'a NotificationId,
        intent: &'a NotificationIntent,
    ) -> BoxFuture<'a, Result<(), FetchError>> {
        let request = self.request(id, *intent);
        Box::pin(send_mutation(self.source.as_ref(), request))
    }
}

enum Wake {
    Remote(Option<CacheEntry<Vec<Notification>>>),
    Local(bool),
}

/// Live notification list for one user.
///
/// Server snapshots come from a polled cache subscription; read and dismiss
/// are applied locally first and confirmed in the background.
pub struct NotificationFeed {
    subscription: Subscription<Vec<Notification>>,
    coordinator: OptimisticMutationCoordinator<NotificationSet>,
    local: watch::Receiver<NotificationSet>,
    merged_at: Option<Instant>,
}

impl NotificationFeed {
    pub fn new(
        subscription: Subscription<Vec<Notification>>,
        sink: Arc<dyn MutationSink<NotificationSet>>,
        policy: ReconcilePolicy,
    ) -> Self {
        let coordinator = OptimisticMutationCoordinator::new(NotificationSet::default(), sink, policy);
        let local = coordinator.watch();
        let mut feed = Self {
            subscription,
            coordinator,
            local,
            merged_at: None,
        };
        let entry = feed.subscription.current();
        feed.merge(&entry);
        feed
    }

    /// Merge `entry` if it carries a payload not merged yet.
    ///
    /// Errored or loading entries re-publish the previous payload; merging it
    /// again would resurrect notifications dismissed since.
    fn merge(&mut self, entry: &CacheEntry<Vec<Notification>>) {
        let Some(items) = entry.value.as_ref() else {
            return;
        };
        let is_new = match entry.origin {
            ValueOrigin::Remote => entry.fetched_at != self.merged_at,
            ValueOrigin::Fallback => self.merged_at.is_none() && self.coordinator.read(|s| s.is_empty()),
            ValueOrigin::Empty => false,
        };
        if !is_new {
            return;
        }
        self.merged_at = entry.fetched_at;
        let items = items.clone();
        let requested_at = entry.requested_at;
        self.coordinator
            .update(|set| set.apply_server_snapshot(items, requested_at));
        let _ = self.local.borrow_and_update();
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.local.borrow().items().to_vec()
    }

    pub fn unread_count(&self) -> usize {
        self.local.borrow().unread_count()
    }

    /// Status of the underlying server query.
    pub fn status(&self) -> EntryStatus {
        self.subscription.current().status
    }

    pub fn last_error(&self) -> Option<FetchError> {
        self.subscription.current().last_error
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.coordinator.policy()
    }

    pub fn mark_read<I>(&self, ids: I) -> MutationTicket<NotificationId>
    where
        I: IntoIterator<Item = NotificationId>,
    {
        self.coordinator.submit(ids, NotificationIntent::MarkRead)
    }

    pub fn mark_all_read(&self) -> MutationTicket<NotificationId> {
        let ids = self.coordinator.read(|s| s.unread_ids());
        self.mark_read(ids)
    }

    pub fn dismiss<I>(&self, ids: I) -> MutationTicket<NotificationId>
    where
        I: IntoIterator<Item = NotificationId>,
    {
        self.coordinator.submit(ids, NotificationIntent::Dismiss)
    }

    /// Refetch now (manual retry).
    pub fn refresh(&self) {
        self.subscription.refresh();
    }

    /// Wait for the next change, remote or local, and return the list.
    /// `None` once the underlying cache entry is gone (sign-out).
    pub async fn changed(&mut self) -> Option<Vec<Notification>> {
        let wake = tokio::select! {
            biased;
            entry = self.subscription.changed() => Wake::Remote(entry),
            res = self.local.changed() => Wake::Local(res.is_ok()),
        };
        match wake {
            Wake::Remote(entry) => {
                let entry = entry?;
                self.merge(&entry);
            }
            Wake::Local(open) => {
                if !open {
                    return None;
                }
                let _ = self.local.borrow_and_update();
            }
        }
        Some(self.notifications())
    }

    pub fn unsubscribe(self) {
        self.subscription.unsubscribe();
    }
}
