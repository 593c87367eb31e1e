//! Message persistence storage
//!
//! Messages belong to a chat, and chats belong to an owner, so every
//! operation here verifies chat ownership before touching message rows.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::database::Database;

/// A persisted conversation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub chat_id: String,
    pub role: String,
    pub content: String,
    /// Original attachment file name, when one was uploaded
    pub file_name: Option<String>,
    /// Resolved URL for the attachment
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Message persistence store
pub struct MessageStore<'a> {
    db: &'a Database,
}

impl<'a> MessageStore<'a> {
    /// Create a new message store with database reference
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn chat_owned_by(&self, user_id: &str, chat_id: &str) -> Result<bool> {
        let count: i64 = self.db.conn().query_row(
            "SELECT COUNT(*) FROM chats WHERE id = ?1 AND user_id = ?2",
            params![chat_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Save a message to an owned chat; returns None when the chat is not
    /// visible to this owner
    pub fn save_message(
        &self,
        user_id: &str,
        chat_id: &str,
        role: &str,
        content: &str,
        file_name: Option<&str>,
        file_url: Option<&str>,
    ) -> Result<Option<MessageRecord>> {
        if !self.chat_owned_by(user_id, chat_id)? {
            return Ok(None);
        }

        let now = Utc::now();
        let now_str = now.to_rfc3339();

        self.db.conn().execute(
            "INSERT INTO messages (chat_id, role, content, file_name, file_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![chat_id, role, content, file_name, file_url, now_str],
        )?;
        let id = self.db.conn().last_insert_rowid();

        // A new message bumps the chat in the recency ordering
        self.db.conn().execute(
            "UPDATE chats SET updated_at = ?1 WHERE id = ?2",
            params![now_str, chat_id],
        )?;

        Ok(Some(MessageRecord {
            id,
            chat_id: chat_id.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            file_name: file_name.map(String::from),
            file_url: file_url.map(String::from),
            created_at: now,
        }))
    }

    /// Load all messages for an owned chat in insertion order
    ///
    /// Returns None when the chat is not visible to this owner.
    pub fn load_messages(&self, user_id: &str, chat_id: &str) -> Result<Option<Vec<MessageRecord>>> {
        if !self.chat_owned_by(user_id, chat_id)? {
            return Ok(None);
        }

        let mut stmt = self.db.conn().prepare(
            "SELECT id, chat_id, role, content, file_name, file_url, created_at
             FROM messages WHERE chat_id = ?1 ORDER BY id",
        )?;
        let messages = stmt
            .query_map([chat_id], |row| {
                let created_at: String = row.get(6)?;
                Ok(MessageRecord {
                    id: row.get(0)?,
                    chat_id: row.get(1)?,
                    role: row.get(2)?,
                    content: row.get(3)?,
                    file_name: row.get(4)?,
                    file_url: row.get(5)?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(messages))
    }
}
