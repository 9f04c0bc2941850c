//! Notification state container: local set with optimistic read/dismiss.

use super::Notification;
use crate::mutation::OptimisticState;
use crate::shared::NotificationId;
use std::collections::HashMap;
use tokio::time::Instant;

/// Mutation intents for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationIntent {
    MarkRead,
    Dismiss,
}

/// What it takes to undo a notification mutation.
#[derive(Debug)]
pub enum NotificationUndo {
    Read,
    Dismissed { index: usize, notification: Notification },
}

/// Locally rendered notifications.
///
/// `read` only moves false → true locally, and a dismissed notification stays
/// out of the set. Server snapshots merged with
/// [`apply_server_snapshot`](Self::apply_server_snapshot) cannot undo a
/// mutation that is still unconfirmed, nor one that settled after the
/// snapshot's fetch was issued.
#[derive(Debug, Clone, Default)]
pub struct NotificationSet {
    items: Vec<Notification>,
    pending_read: HashMap<NotificationId, usize>,
    pending_dismiss: HashMap<NotificationId, usize>,
    /// When each settled mutation finished. Dropped once a snapshot requested
    /// later than that is merged.
    settled_read: HashMap<NotificationId, Instant>,
    settled_dismiss: HashMap<NotificationId, Instant>,
}

impl NotificationSet {
    pub fn new(items: Vec<Notification>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.items.iter().find(|n| &n.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    pub fn unread_ids(&self) -> Vec<NotificationId> {
        self.items
            .iter()
            .filter(|n| !n.read)
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `id` has an unconfirmed mutation.
    pub fn is_pending(&self, id: &NotificationId) -> bool {
        self.pending_read.contains_key(id) || self.pending_dismiss.contains_key(id)
    }

    /// Replace the set with a server payload whose fetch was issued at
    /// `requested_at`, keeping local mutations the payload cannot reflect on
    /// top. `None` means the issue time is unknown and every mutation is kept.
    pub fn apply_server_snapshot(
        &mut self,
        items: Vec<Notification>,
        requested_at: Option<Instant>,
    ) {
        if let Some(requested_at) = requested_at {
            self.settled_read.retain(|_, settled| *settled >= requested_at);
            self.settled_dismiss.retain(|_, settled| *settled >= requested_at);
        }
        self.items = items
            .into_iter()
            .filter(|n| !self.is_dismissed(&n.id))
            .map(|mut n| {
                if self.is_read_locally(&n.id) {
                    n.read = true;
                }
                n
            })
            .collect();
    }

    fn is_read_locally(&self, id: &NotificationId) -> bool {
        self.pending_read.contains_key(id) || self.settled_read.contains_key(id)
    }

    fn is_dismissed(&self, id: &NotificationId) -> bool {
        self.pending_dismiss.contains_key(id) || self.settled_dismiss.contains_key(id)
    }

    fn position(&self, id: &NotificationId) -> Option<usize> {
        self.items.iter().position(|n| &n.id == id)
    }
}

fn bump(pending: &mut HashMap<NotificationId, usize>, id: &NotificationId) {
    *pending.entry(id.clone()).or_default() += 1;
}

fn unbump(pending: &mut HashMap<NotificationId, usize>, id: &NotificationId) {
    if let Some(count) = pending.get_mut(id) {
        *count -= 1;
        if *count == 0 {
            pending.remove(id);
        }
    }
}

impl OptimisticState for NotificationSet {
    type Id = NotificationId;
    type Intent = NotificationIntent;
    type Undo = NotificationUndo;

    fn apply_local(&mut self, id: &NotificationId, intent: &NotificationIntent) -> Option<NotificationUndo> {
        let index = self.position(id)?;
        match intent {
            NotificationIntent::MarkRead => {
                if self.items[index].read {
                    return None;
                }
                self.items[index].read = true;
                bump(&mut self.pending_read, id);
                Some(NotificationUndo::Read)
            }
            NotificationIntent::Dismiss => {
                let notification = self.items.remove(index);
                bump(&mut self.pending_dismiss, id);
                Some(NotificationUndo::Dismissed {
                    index,
                    notification,
                })
            }
        }
    }

    fn revert(&mut self, id: &NotificationId, undo: NotificationUndo) {
        match undo {
            NotificationUndo::Read => {
                if let Some(index) = self.position(id) {
                    self.items[index].read = false;
                }
            }
            NotificationUndo::Dismissed {
                index,
                notification,
            } => {
                if self.position(id).is_none() {
                    let index = index.min(self.items.len());
                    self.items.insert(index, notification);
                }
            }
        }
    }

    fn settle(&mut self, id: &NotificationId, intent: &NotificationIntent, rolled_back: bool) {
        let (pending, settled) = match intent {
            NotificationIntent::MarkRead => (&mut self.pending_read, &mut self.settled_read),
            NotificationIntent::Dismiss => (&mut self.pending_dismiss, &mut self.settled_dismiss),
        };
        unbump(pending, id);
        if rolled_back {
            settled.remove(id);
        } else {
            settled.insert(id.clone(), Instant::now());
        }
    }
}
