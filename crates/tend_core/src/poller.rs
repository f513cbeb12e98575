//! Due-occurrence polling.
//!
//! On a fixed interval the poller asks the store for active reminders
//! whose next occurrence has passed and hands each to the [`Notifier`].
//! Delivery is at-least-once and idempotent from the engine's point of
//! view: the poller never advances the schedule or logs an outcome, so a
//! due reminder keeps resurfacing every tick until an explicit action is
//! recorded or the reminder is deactivated.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::StoreError;
use crate::id::{ReminderId, UserId};
use crate::reminder::Reminder;
use crate::store::ReminderStore;

/// What the notifier receives for a due reminder. Delivery mechanics
/// (push, local notification) live outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueNotice {
    pub reminder_id: ReminderId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
}

impl From<&Reminder> for DueNotice {
    fn from(reminder: &Reminder) -> Self {
        Self {
            reminder_id: reminder.id.clone(),
            user_id: reminder.user_id.clone(),
            title: reminder.title.clone(),
            description: reminder.description.clone(),
        }
    }
}

/// Delivery failure. Recoverable: the reminder stays due and is retried
/// on the next tick.
#[derive(Debug, Error, Diagnostic)]
#[error("notification delivery failed: {reason}")]
#[diagnostic(code(tend_core::notify))]
pub struct NotifyError {
    pub reason: String,
}

impl NotifyError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Delivers due notices to the user's device.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &DueNotice) -> Result<(), NotifyError>;
}

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic task surfacing due reminders to a [`Notifier`].
pub struct DuePoller {
    store: Arc<dyn ReminderStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl DuePoller {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// One polling cycle. Returns how many notices were delivered;
    /// per-reminder delivery failures are logged and left due for the
    /// next tick.
    pub async fn tick(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let due = self.store.find_due(now).await?;
        let mut delivered = 0;
        for reminder in &due {
            let notice = DueNotice::from(reminder);
            match self.notifier.notify(&notice).await {
                Ok(()) => {
                    delivered += 1;
                    debug!(reminder_id = %reminder.id, "delivered due notice");
                }
                Err(err) => {
                    warn!(
                        reminder_id = %reminder.id,
                        error = %err,
                        "notifier failed; reminder stays due for the next tick"
                    );
                }
            }
        }
        Ok(delivered)
    }

    /// Run the poll loop on a background task. Store failures are logged
    /// and retried on the next tick, never fatal to the loop. Ticks may
    /// drift; "due" is a <= comparison, so drift is harmless.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = self.tick().await {
                    warn!(error = %err, "due poll failed; retrying next tick");
                }
            }
        })
    }
}
