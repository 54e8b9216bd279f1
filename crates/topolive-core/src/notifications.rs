use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::ids::NotificationId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

/// A transient user-facing message.
#[derive(Clone, Debug)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: Instant,
}

/// Bounds applied to the queue so undismissed entries cannot pile up.
#[derive(Clone, Debug)]
pub struct NotificationLimits {
    pub max_entries: usize,
    pub max_age: Duration,
}

impl Default for NotificationLimits {
    fn default() -> Self {
        Self {
            max_entries: 32,
            max_age: Duration::from_secs(10),
        }
    }
}

/// Deduplicated queue of notifications. Dedup key is the message text only;
/// removal is by id so two entries with equal content are never confused.
#[derive(Debug, Default)]
pub struct NotificationRegistry {
    entries: VecDeque<Notification>,
    limits: NotificationLimits,
    next_id: u64,
}

impl NotificationRegistry {
    pub fn new(limits: NotificationLimits) -> Self {
        Self {
            entries: VecDeque::new(),
            limits,
            next_id: 0,
        }
    }

    /// Queue a notification. Returns `None` when an entry with the same
    /// message is already queued.
    pub fn add(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        now: Instant,
    ) -> Option<NotificationId> {
        let message = message.into();
        if self.entries.iter().any(|n| n.message == message) {
            tracing::trace!(message = %message, "duplicate notification dropped");
            return None;
        }

        if self.limits.max_entries > 0 && self.entries.len() >= self.limits.max_entries {
            if let Some(evicted) = self.entries.pop_front() {
                tracing::debug!(id = %evicted.id, "notification queue full, evicted oldest");
            }
        }

        self.next_id += 1;
        let id = NotificationId(self.next_id);
        self.entries.push_back(Notification {
            id,
            message,
            kind,
            created_at: now,
        });
        Some(id)
    }

    /// Remove the entry with this id. Unknown ids are ignored.
    pub fn remove(&mut self, id: NotificationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    /// Drop every entry older than `max_age`. Returns how many were removed.
    pub fn expire(&mut self, now: Instant) -> usize {
        let max_age = self.limits.max_age;
        let before = self.entries.len();
        self.entries
            .retain(|n| now.saturating_duration_since(n.created_at) < max_age);
        before - self.entries.len()
    }

    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limits(&self) -> &NotificationLimits {
        &self.limits
    }
}
