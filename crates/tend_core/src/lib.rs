//! Tend Core - Recurring Care-Reminder Scheduling Engine
//!
//! This crate computes when recurring pet-care reminders next fire, tracks
//! per-occurrence outcomes (completed / snoozed / dismissed), and keeps
//! future occurrences consistent as rules and outcomes change.
//!
//! # Architecture
//!
//! - [`schedule`] - pure recurrence calculator, no side effects, no I/O
//! - [`scheduler`] - CRUD and action/log orchestration over a store
//! - [`poller`] - periodic due-reminder surfacing to a notifier
//! - [`store`] - storage boundary trait plus an in-memory implementation
//! - [`clock`] - injectable time source so tests never wait on real time
//!
//! Persistence and notification delivery are collaborators behind traits;
//! see the `tend-db` crate for the SQLite store.

pub mod clock;
pub mod error;
pub mod id;
pub mod poller;
pub mod reminder;
pub mod schedule;
pub mod scheduler;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, Result, StoreError};
pub use id::{PetId, ReminderId, ReminderLogId, UserId};
pub use poller::{DueNotice, DuePoller, Notifier, NotifyError};
pub use reminder::{
    ActionOptions, CreateReminder, LogStatus, Reminder, ReminderFilter, ReminderKind, ReminderLog,
    ReminderPatch,
};
pub use schedule::{Frequency, ScheduleSpec, WeekdaySet, next_occurrence, snooze_until};
pub use scheduler::ReminderScheduler;
pub use store::{InMemoryStore, ReminderStore};
