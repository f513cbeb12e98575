//! [`ReminderStore`] implementation over SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tend_core::{
    Reminder, ReminderFilter, ReminderId, ReminderLog, ReminderStore, StoreError, UserId,
};

use crate::queries;

/// SQLite-backed reminder store.
///
/// The version check rides on the `WHERE id = ? AND version = ?` clause of
/// the update statement: zero affected rows means either the reminder is
/// gone or another writer bumped the version first.
#[derive(Debug, Clone)]
pub struct SqliteReminderStore {
    pool: SqlitePool,
}

impl SqliteReminderStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderStore for SqliteReminderStore {
    async fn get(&self, id: &ReminderId) -> Result<Option<Reminder>, StoreError> {
        Ok(queries::get_reminder(&self.pool, id).await?)
    }

    async fn insert(&self, reminder: &Reminder) -> Result<(), StoreError> {
        Ok(queries::insert_reminder(&self.pool, reminder).await?)
    }

    async fn update(&self, reminder: &Reminder) -> Result<Reminder, StoreError> {
        let affected = queries::update_reminder(&self.pool, reminder).await?;
        if affected == 0 {
            return match queries::get_reminder(&self.pool, &reminder.id).await? {
                Some(_) => Err(StoreError::VersionConflict),
                None => Err(StoreError::NotFound),
            };
        }
        let mut saved = reminder.clone();
        saved.version += 1;
        Ok(saved)
    }

    async fn delete(&self, id: &ReminderId) -> Result<(), StoreError> {
        let affected = queries::delete_reminder(&self.pool, id).await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        filter: &ReminderFilter,
    ) -> Result<Vec<Reminder>, StoreError> {
        Ok(queries::list_reminders_for_user(&self.pool, user_id, filter).await?)
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, StoreError> {
        Ok(queries::find_due_reminders(&self.pool, now).await?)
    }

    async fn append_log(&self, log: &ReminderLog) -> Result<(), StoreError> {
        Ok(queries::insert_log(&self.pool, log).await?)
    }

    async fn list_logs(&self, reminder_id: &ReminderId) -> Result<Vec<ReminderLog>, StoreError> {
        Ok(queries::list_logs(&self.pool, reminder_id).await?)
    }
}
