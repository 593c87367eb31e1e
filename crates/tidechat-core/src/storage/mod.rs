//! Persistence layer
//!
//! SQLite-based storage for:
//! - Chats with owner scoping
//! - Messages with optional file references
//! - Per-user preferences

mod chats;
mod database;
mod messages;
mod preferences;

pub use chats::{ChatRecord, ChatStore};
pub use database::{Database, SharedDatabase};
pub use messages::{MessageRecord, MessageStore};
pub use preferences::Preferences;
