//! Storage boundary.
//!
//! The engine never owns persistence: it talks to a [`ReminderStore`]
//! collaborator. [`InMemoryStore`] is a complete in-process implementation
//! honoring the same version-check contract, used by the engine's own
//! tests and available to downstream test suites.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::id::{ReminderId, UserId};
use crate::reminder::{Reminder, ReminderFilter, ReminderLog};

/// Durable storage for reminders and their logs.
///
/// `update` must enforce optimistic concurrency: the write only succeeds
/// when the stored row still carries the caller's `version`, and the
/// stored version is bumped on success.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn get(&self, id: &ReminderId) -> Result<Option<Reminder>, StoreError>;

    async fn insert(&self, reminder: &Reminder) -> Result<(), StoreError>;

    /// Version-checked write. Returns the stored reminder (with the bumped
    /// version) on success, [`StoreError::VersionConflict`] when another
    /// writer got there first.
    async fn update(&self, reminder: &Reminder) -> Result<Reminder, StoreError>;

    async fn delete(&self, id: &ReminderId) -> Result<(), StoreError>;

    /// A user's reminders ordered by `next_occurrence_at` ascending.
    async fn list_for_user(
        &self,
        user_id: &UserId,
        filter: &ReminderFilter,
    ) -> Result<Vec<Reminder>, StoreError>;

    /// Active reminders whose next occurrence is at or before `now`,
    /// ordered by `next_occurrence_at` ascending.
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, StoreError>;

    async fn append_log(&self, log: &ReminderLog) -> Result<(), StoreError>;

    /// Logs for a reminder ordered by `reminded_at` descending.
    async fn list_logs(&self, reminder_id: &ReminderId) -> Result<Vec<ReminderLog>, StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    reminders: HashMap<ReminderId, Reminder>,
    logs: Vec<ReminderLog>,
}

/// In-process store backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReminderStore for InMemoryStore {
    async fn get(&self, id: &ReminderId) -> Result<Option<Reminder>, StoreError> {
        Ok(self.inner.lock().reminders.get(id).cloned())
    }

    async fn insert(&self, reminder: &Reminder) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.reminders.contains_key(&reminder.id) {
            return Err(StoreError::Backend(format!(
                "duplicate reminder id: {}",
                reminder.id
            )));
        }
        inner.reminders.insert(reminder.id.clone(), reminder.clone());
        Ok(())
    }

    async fn update(&self, reminder: &Reminder) -> Result<Reminder, StoreError> {
        let mut inner = self.inner.lock();
        let stored = inner
            .reminders
            .get_mut(&reminder.id)
            .ok_or(StoreError::NotFound)?;
        if stored.version != reminder.version {
            return Err(StoreError::VersionConflict);
        }
        let mut saved = reminder.clone();
        saved.version += 1;
        *stored = saved.clone();
        Ok(saved)
    }

    async fn delete(&self, id: &ReminderId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.reminders.remove(id).ok_or(StoreError::NotFound)?;
        // Cascade, matching the SQL store's foreign-key policy.
        inner.logs.retain(|log| &log.reminder_id != id);
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        filter: &ReminderFilter,
    ) -> Result<Vec<Reminder>, StoreError> {
        let inner = self.inner.lock();
        let mut matches: Vec<Reminder> = inner
            .reminders
            .values()
            .filter(|r| &r.user_id == user_id)
            .filter(|r| filter.pet_id.as_ref().map_or(true, |pet| &r.pet_id == pet))
            .filter(|r| !filter.active_only || r.is_active)
            .cloned()
            .collect();
        matches.sort_by_key(|r| r.next_occurrence_at);
        let offset = filter.offset.unwrap_or(0) as usize;
        let mut page: Vec<Reminder> = matches.into_iter().skip(offset).collect();
        if let Some(limit) = filter.limit {
            page.truncate(limit as usize);
        }
        Ok(page)
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, StoreError> {
        let inner = self.inner.lock();
        let mut due: Vec<Reminder> = inner
            .reminders
            .values()
            .filter(|r| r.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|r| r.next_occurrence_at);
        Ok(due)
    }

    async fn append_log(&self, log: &ReminderLog) -> Result<(), StoreError> {
        self.inner.lock().logs.push(log.clone());
        Ok(())
    }

    async fn list_logs(&self, reminder_id: &ReminderId) -> Result<Vec<ReminderLog>, StoreError> {
        let inner = self.inner.lock();
        let mut logs: Vec<ReminderLog> = inner
            .logs
            .iter()
            .filter(|log| &log.reminder_id == reminder_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.reminded_at.cmp(&a.reminded_at));
        Ok(logs)
    }
}
