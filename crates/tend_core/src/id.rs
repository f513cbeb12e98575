//! Type-safe ID generation
//!
//! Every entity gets its own ID newtype with a stable prefix, backed by a
//! UUID. The prefix shows up in logs and error messages; storage uses the
//! bare key via [`as_str`](ReminderId::as_str).

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use uuid::Uuid;

/// Macro to define new ID types with minimal boilerplate
macro_rules! define_id_type {
    ($(#[$meta:meta])* $type_name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $type_name(String);

        impl $type_name {
            /// Generate a fresh random ID.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().simple().to_string())
            }

            /// Wrap an existing key (e.g., read back from storage).
            pub fn from_key(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// The bare key without the display prefix.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }

        impl From<&str> for $type_name {
            fn from(key: &str) -> Self {
                Self(key.to_string())
            }
        }
    };
}

define_id_type!(
    /// Identifies a [`Reminder`](crate::reminder::Reminder).
    ReminderId,
    "reminder"
);

define_id_type!(
    /// Identifies a [`ReminderLog`](crate::reminder::ReminderLog) entry.
    ReminderLogId,
    "reminder_log"
);

define_id_type!(
    /// Identifies the user who owns a reminder.
    UserId,
    "user"
);

define_id_type!(
    /// Identifies the pet (or other care subject) a reminder is about.
    PetId,
    "pet"
);
