//! Row models.
//!
//! These structs map directly to database tables via sqlx and convert
//! to/from the `tend-core` domain types. Enum-like columns are stored as
//! their snake_case names; the weekday set as an integer bitmask.

use chrono::{DateTime, NaiveTime, Utc};
use sqlx::FromRow;
use tend_core::{
    Frequency, LogStatus, PetId, Reminder, ReminderId, ReminderKind, ReminderLog, ReminderLogId,
    ScheduleSpec, UserId, WeekdaySet,
};

use crate::error::DbError;

/// One row of the `reminders` table.
#[derive(Debug, Clone, FromRow)]
pub struct ReminderRow {
    pub id: String,
    pub user_id: String,
    pub pet_id: String,
    pub kind: String,
    pub title: String,
    pub description: Option<String>,
    pub frequency: String,
    pub time_of_day: NaiveTime,
    pub days_of_week: Option<i64>,
    pub interval_days: Option<i64>,
    pub is_active: bool,
    pub next_occurrence_at: DateTime<Utc>,
    pub last_reminded_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = DbError;

    fn try_from(row: ReminderRow) -> Result<Self, DbError> {
        let frequency = Frequency::parse(&row.frequency)
            .ok_or_else(|| DbError::invalid_data(format!("unknown frequency: {}", row.frequency)))?;
        let kind = ReminderKind::parse(&row.kind)
            .ok_or_else(|| DbError::invalid_data(format!("unknown reminder kind: {}", row.kind)))?;
        let days_of_week = row
            .days_of_week
            .map(|mask| {
                let mask = u8::try_from(mask)
                    .map_err(|_| DbError::invalid_data(format!("weekday mask out of range: {mask}")))?;
                WeekdaySet::from_mask(mask)
                    .map_err(|err| DbError::invalid_data(err.to_string()))
            })
            .transpose()?;
        let interval_days = row
            .interval_days
            .map(|n| {
                u32::try_from(n)
                    .map_err(|_| DbError::invalid_data(format!("interval out of range: {n}")))
            })
            .transpose()?;

        Ok(Reminder {
            id: ReminderId::from_key(row.id),
            user_id: UserId::from_key(row.user_id),
            pet_id: PetId::from_key(row.pet_id),
            kind,
            title: row.title,
            description: row.description,
            schedule: ScheduleSpec {
                frequency,
                time_of_day: row.time_of_day,
                days_of_week,
                interval_days,
            },
            is_active: row.is_active,
            next_occurrence_at: row.next_occurrence_at,
            last_reminded_at: row.last_reminded_at,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// One row of the `reminder_logs` table.
#[derive(Debug, Clone, FromRow)]
pub struct ReminderLogRow {
    pub id: String,
    pub reminder_id: String,
    pub reminded_at: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
    pub snoozed_until: Option<DateTime<Utc>>,
}

impl TryFrom<ReminderLogRow> for ReminderLog {
    type Error = DbError;

    fn try_from(row: ReminderLogRow) -> Result<Self, DbError> {
        let status = LogStatus::parse(&row.status)
            .ok_or_else(|| DbError::invalid_data(format!("unknown log status: {}", row.status)))?;
        Ok(ReminderLog {
            id: ReminderLogId::from_key(row.id),
            reminder_id: ReminderId::from_key(row.reminder_id),
            reminded_at: row.reminded_at,
            status,
            notes: row.notes,
            snoozed_until: row.snoozed_until,
        })
    }
}
