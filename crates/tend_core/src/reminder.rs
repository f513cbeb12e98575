//! Reminder and reminder-log models.
//!
//! A [`Reminder`] is a recurring care task for a pet; a [`ReminderLog`] is
//! the append-only record of what happened to one occurrence. Logs are
//! never mutated or deleted by the engine.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{PetId, ReminderId, ReminderLogId, UserId};
use crate::schedule::{Frequency, ScheduleSpec, WeekdaySet};

/// What kind of care task this is. Informational only: the scheduler
/// treats every kind the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Feeding,
    Medicine,
    HealthCheck,
    Bathing,
    Vaccination,
    Exercise,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feeding => "feeding",
            Self::Medicine => "medicine",
            Self::HealthCheck => "health_check",
            Self::Bathing => "bathing",
            Self::Vaccination => "vaccination",
            Self::Exercise => "exercise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "feeding" => Some(Self::Feeding),
            "medicine" => Some(Self::Medicine),
            "health_check" => Some(Self::HealthCheck),
            "bathing" => Some(Self::Bathing),
            "vaccination" => Some(Self::Vaccination),
            "exercise" => Some(Self::Exercise),
            _ => None,
        }
    }
}

/// A recurring care task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub user_id: UserId,
    pub pet_id: PetId,
    pub kind: ReminderKind,
    pub title: String,
    pub description: Option<String>,
    pub schedule: ScheduleSpec,
    /// Inactive reminders are skipped by due-polling but keep their
    /// computed `next_occurrence_at`.
    pub is_active: bool,
    pub next_occurrence_at: DateTime<Utc>,
    /// Set every time an action is logged against an occurrence.
    pub last_reminded_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency token; bumped by every successful store
    /// update.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    /// Whether this reminder should surface in due-polling at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_occurrence_at <= now
    }
}

/// Outcome recorded against one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    /// Done; schedule the next occurrence from the rule.
    Completed,
    /// Deferred to a fixed instant, overriding the rule.
    Snoozed,
    /// Seen but skipped; schedule the next occurrence anyway.
    Dismissed,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Snoozed => "snoozed",
            Self::Dismissed => "dismissed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "snoozed" => Some(Self::Snoozed),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }
}

/// Immutable record of one occurrence's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderLog {
    pub id: ReminderLogId,
    pub reminder_id: ReminderId,
    /// When the action was recorded.
    pub reminded_at: DateTime<Utc>,
    pub status: LogStatus,
    pub notes: Option<String>,
    /// Present only when `status` is [`LogStatus::Snoozed`].
    pub snoozed_until: Option<DateTime<Utc>>,
}

/// Input for [`ReminderScheduler::create`](crate::scheduler::ReminderScheduler::create).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReminder {
    pub user_id: UserId,
    pub pet_id: PetId,
    pub kind: ReminderKind,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub schedule: ScheduleSpec,
}

/// Partial update. `None` fields are left untouched; schedule fields are
/// merged into the current spec before revalidation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReminderPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<ReminderKind>,
    pub frequency: Option<Frequency>,
    pub time_of_day: Option<NaiveTime>,
    pub days_of_week: Option<WeekdaySet>,
    pub interval_days: Option<u32>,
}

impl ReminderPatch {
    /// Whether applying this patch forces a schedule recomputation.
    pub fn touches_schedule(&self) -> bool {
        self.frequency.is_some()
            || self.time_of_day.is_some()
            || self.days_of_week.is_some()
            || self.interval_days.is_some()
    }
}

/// Options for [`ReminderScheduler::log_action`](crate::scheduler::ReminderScheduler::log_action).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionOptions {
    pub notes: Option<String>,
    /// Required (> 0) when logging [`LogStatus::Snoozed`].
    pub snooze_minutes: Option<u32>,
}

/// Listing filter for a user's reminders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReminderFilter {
    pub pet_id: Option<PetId>,
    pub active_only: bool,
    /// Page size; `None` returns everything.
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
