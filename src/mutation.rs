//! Optimistic local mutation with remote confirmation.
//!
//! A mutation is applied to local state first, then confirmed remotely with
//! one call per affected item. Items are confirmed in parallel; mutations for
//! the same item id run strictly in submission order. What happens to local
//! state when a confirmation fails is governed by [`ReconcilePolicy`].

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::FetchError;

/// What to do with local state when a remote confirmation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Keep the optimistic state and log the failure.
    #[default]
    ForwardOnly,
    /// Restore the item's pre-mutation state.
    Rollback,
}

/// Result of confirming one item's mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Confirmed,
    /// Nothing changed locally, so no remote call was made.
    NoOp,
    Failed {
        error: FetchError,
        rolled_back: bool,
    },
}

impl MutationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Local state that mutations are applied to.
pub trait OptimisticState: Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    type Intent: Clone + Debug + Send + Sync + 'static;
    /// Whatever `revert` needs to restore the item.
    type Undo: Send + 'static;

    /// Apply `intent` to `id`. `None` when the mutation changes nothing.
    fn apply_local(&mut self, id: &Self::Id, intent: &Self::Intent) -> Option<Self::Undo>;

    /// Undo a previously applied mutation.
    fn revert(&mut self, id: &Self::Id, undo: Self::Undo);

    /// Called once the remote confirmation for `id` has finished, either way.
    /// `rolled_back` is set when `revert` ran just before.
    fn settle(&mut self, _id: &Self::Id, _intent: &Self::Intent, _rolled_back: bool) {}
}

/// Remote side of a mutation: one confirming call per item.
pub trait MutationSink<S: OptimisticState>: Send + Sync {
    fn confirm<'a>(
        &'a self,
        id: &'a S::Id,
        intent: &'a S::Intent,
    ) -> BoxFuture<'a, Result<(), FetchError>>;
}

struct Lane {
    seq: u64,
    done: oneshot::Receiver<()>,
}

struct Inner<S: OptimisticState> {
    state: watch::Sender<S>,
    sink: Arc<dyn MutationSink<S>>,
    policy: ReconcilePolicy,
    lanes: Mutex<HashMap<S::Id, Lane>>,
    next_seq: AtomicU64,
}

impl<S: OptimisticState> Inner<S> {
    fn lanes(&self) -> MutexGuard<'_, HashMap<S::Id, Lane>> {
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(
        &self,
        id: &S::Id,
        intent: &S::Intent,
        undo: S::Undo,
        result: Result<(), FetchError>,
    ) -> MutationOutcome {
        match result {
            Ok(()) => {
                self.state.send_modify(|s| s.settle(id, intent, false));
                MutationOutcome::Confirmed
            }
            Err(error) => {
                let rolled_back = self.policy == ReconcilePolicy::Rollback;
                tracing::warn!(
                    id = ?id,
                    intent = ?intent,
                    rolled_back,
                    "Mutation confirmation failed: {}",
                    error
                );
                self.state.send_modify(|s| {
                    if rolled_back {
                        s.revert(id, undo);
                    }
                    s.settle(id, intent, rolled_back);
                });
                MutationOutcome::Failed { error, rolled_back }
            }
        }
    }

    fn release_lane(&self, id: &S::Id, seq: u64) {
        let mut lanes = self.lanes();
        if lanes.get(id).is_some_and(|lane| lane.seq == seq) {
            lanes.remove(id);
        }
    }
}

/// Applies mutations locally and confirms them remotely.
pub struct OptimisticMutationCoordinator<S: OptimisticState> {
    inner: Arc<Inner<S>>,
}

impl<S: OptimisticState> Clone for OptimisticMutationCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: OptimisticState> OptimisticMutationCoordinator<S> {
    pub fn new(state: S, sink: Arc<dyn MutationSink<S>>, policy: ReconcilePolicy) -> Self {
        let (state, _) = watch::channel(state);
        Self {
            inner: Arc::new(Inner {
                state,
                sink,
                policy,
                lanes: Mutex::new(HashMap::new()),
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.inner.policy
    }

    /// Read the local state.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Modify the local state outside of a mutation (e.g. merge a server
    /// snapshot). Watchers are notified.
    pub fn update(&self, f: impl FnOnce(&mut S)) {
        self.inner.state.send_modify(f);
    }

    /// Receiver woken on every local state change.
    pub fn watch(&self) -> watch::Receiver<S> {
        self.inner.state.subscribe()
    }

    /// Number of ids with a confirmation still queued or running.
    pub fn in_flight(&self) -> usize {
        self.inner.lanes().len()
    }

    /// Apply `intent` to every id locally, then confirm each remotely.
    ///
    /// Local application happens before this returns. Must be called from
    /// within a tokio runtime.
    pub fn submit<I>(&self, ids: I, intent: S::Intent) -> MutationTicket<S::Id>
    where
        I: IntoIterator<Item = S::Id>,
    {
        let entries = ids
            .into_iter()
            .map(|id| {
                let pending = self.submit_one(id.clone(), intent.clone());
                (id, pending)
            })
            .collect();
        MutationTicket { entries }
    }

    fn submit_one(&self, id: S::Id, intent: S::Intent) -> Pending {
        let mut undo = None;
        self.inner.state.send_if_modified(|s| {
            undo = s.apply_local(&id, &intent);
            undo.is_some()
        });
        let Some(undo) = undo else {
            tracing::debug!(id = ?id, intent = ?intent, "Mutation is a local no-op");
            return Pending::Ready(MutationOutcome::NoOp);
        };

        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let (done_tx, done_rx) = oneshot::channel();
        let previous = self
            .inner
            .lanes()
            .insert(id.clone(), Lane { seq, done: done_rx })
            .map(|lane| lane.done);

        let inner = Arc::clone(&self.inner);
        Pending::Running(tokio::spawn(async move {
            if let Some(previous) = previous {
                // Err means the previous task ended without signalling; either way it is done.
                let _ = previous.await;
            }
            let result = inner.sink.confirm(&id, &intent).await;
            let outcome = inner.finish(&id, &intent, undo, result);
            let _ = done_tx.send(());
            inner.release_lane(&id, seq);
            outcome
        }))
    }
}

enum Pending {
    Ready(MutationOutcome),
    Running(JoinHandle<MutationOutcome>),
}

/// Handle to the confirmations of one submitted mutation.
///
/// Dropping the ticket does not cancel anything.
pub struct MutationTicket<Id> {
    entries: Vec<(Id, Pending)>,
}

impl<Id> MutationTicket<Id> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wait for every confirmation, in submission order.
    pub async fn outcomes(self) -> Vec<(Id, MutationOutcome)> {
        let mut out = Vec::with_capacity(self.entries.len());
        for (id, pending) in self.entries {
            let outcome = match pending {
                Pending::Ready(outcome) => outcome,
                Pending::Running(handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => MutationOutcome::Failed {
                        error: FetchError::Network(format!("confirmation task aborted: {}", e)),
                        rolled_back: false,
                    },
                },
            };
            out.push((id, outcome));
        }
        out
    }
}
