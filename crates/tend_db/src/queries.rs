//! Reminder queries.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tend_core::{Reminder, ReminderFilter, ReminderId, ReminderLog, UserId};

use crate::error::DbResult;
use crate::models::{ReminderLogRow, ReminderRow};

// ============================================================================
// Reminder CRUD
// ============================================================================

/// Create a new reminder.
pub async fn insert_reminder(pool: &SqlitePool, reminder: &Reminder) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO reminders (
            id, user_id, pet_id, kind, title, description,
            frequency, time_of_day, days_of_week, interval_days,
            is_active, next_occurrence_at, last_reminded_at, version,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(reminder.id.as_str())
    .bind(reminder.user_id.as_str())
    .bind(reminder.pet_id.as_str())
    .bind(reminder.kind.as_str())
    .bind(&reminder.title)
    .bind(&reminder.description)
    .bind(reminder.schedule.frequency.as_str())
    .bind(reminder.schedule.time_of_day)
    .bind(reminder.schedule.days_of_week.map(|d| d.as_mask() as i64))
    .bind(reminder.schedule.interval_days.map(|n| n as i64))
    .bind(reminder.is_active)
    .bind(reminder.next_occurrence_at)
    .bind(reminder.last_reminded_at)
    .bind(reminder.version)
    .bind(reminder.created_at)
    .bind(reminder.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Get a reminder by ID.
pub async fn get_reminder(pool: &SqlitePool, id: &ReminderId) -> DbResult<Option<Reminder>> {
    let row = sqlx::query_as::<_, ReminderRow>("SELECT * FROM reminders WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(pool)
        .await?;
    row.map(Reminder::try_from).transpose()
}

/// Version-checked update. Returns the number of rows affected: zero means
/// the row is missing or carries a different version.
pub async fn update_reminder(pool: &SqlitePool, reminder: &Reminder) -> DbResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE reminders SET
            kind = ?, title = ?, description = ?,
            frequency = ?, time_of_day = ?, days_of_week = ?, interval_days = ?,
            is_active = ?, next_occurrence_at = ?, last_reminded_at = ?,
            version = version + 1, updated_at = ?
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(reminder.kind.as_str())
    .bind(&reminder.title)
    .bind(&reminder.description)
    .bind(reminder.schedule.frequency.as_str())
    .bind(reminder.schedule.time_of_day)
    .bind(reminder.schedule.days_of_week.map(|d| d.as_mask() as i64))
    .bind(reminder.schedule.interval_days.map(|n| n as i64))
    .bind(reminder.is_active)
    .bind(reminder.next_occurrence_at)
    .bind(reminder.last_reminded_at)
    .bind(reminder.updated_at)
    .bind(reminder.id.as_str())
    .bind(reminder.version)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Delete a reminder; logs cascade at the schema level.
pub async fn delete_reminder(pool: &SqlitePool, id: &ReminderId) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM reminders WHERE id = ?")
        .bind(id.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// List a user's reminders ordered by next occurrence.
pub async fn list_reminders_for_user(
    pool: &SqlitePool,
    user_id: &UserId,
    filter: &ReminderFilter,
) -> DbResult<Vec<Reminder>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT * FROM reminders WHERE user_id = ");
    query.push_bind(user_id.as_str());
    if let Some(pet_id) = &filter.pet_id {
        query.push(" AND pet_id = ");
        query.push_bind(pet_id.as_str());
    }
    if filter.active_only {
        query.push(" AND is_active = 1");
    }
    query.push(" ORDER BY next_occurrence_at ASC");
    if let Some(limit) = filter.limit {
        query.push(" LIMIT ");
        query.push_bind(limit as i64);
        if let Some(offset) = filter.offset {
            query.push(" OFFSET ");
            query.push_bind(offset as i64);
        }
    }

    let rows = query
        .build_query_as::<ReminderRow>()
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(Reminder::try_from).collect()
}

/// Active reminders whose next occurrence is at or before `now`.
pub async fn find_due_reminders(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> DbResult<Vec<Reminder>> {
    let rows = sqlx::query_as::<_, ReminderRow>(
        r#"
        SELECT * FROM reminders
        WHERE is_active = 1 AND next_occurrence_at <= ?
        ORDER BY next_occurrence_at ASC
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Reminder::try_from).collect()
}

// ============================================================================
// Reminder logs (append-only)
// ============================================================================

/// Append a log entry. Logs are never updated or deleted individually.
pub async fn insert_log(pool: &SqlitePool, log: &ReminderLog) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO reminder_logs (id, reminder_id, reminded_at, status, notes, snoozed_until)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(log.id.as_str())
    .bind(log.reminder_id.as_str())
    .bind(log.reminded_at)
    .bind(log.status.as_str())
    .bind(&log.notes)
    .bind(log.snoozed_until)
    .execute(pool)
    .await?;
    Ok(())
}

/// A reminder's log history, most recent first.
pub async fn list_logs(pool: &SqlitePool, reminder_id: &ReminderId) -> DbResult<Vec<ReminderLog>> {
    let rows = sqlx::query_as::<_, ReminderLogRow>(
        "SELECT * FROM reminder_logs WHERE reminder_id = ? ORDER BY reminded_at DESC",
    )
    .bind(reminder_id.as_str())
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(ReminderLog::try_from).collect()
}
