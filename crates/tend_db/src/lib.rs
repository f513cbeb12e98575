//! Tend Database Layer
//!
//! SQLite-based storage backend for the Tend reminder engine.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tend_db::ReminderDb;
//!
//! let db = ReminderDb::open("path/to/reminders.db").await?;
//! let store = db.store(); // implements tend_core::ReminderStore
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod queries;
pub mod store;

pub use connection::ReminderDb;
pub use error::{DbError, DbResult};
pub use store::SqliteReminderStore;
