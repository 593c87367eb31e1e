//! Chat CRUD operations
//!
//! Every operation is scoped to an owner: a chat belonging to another user
//! behaves exactly like a chat that does not exist.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::database::Database;

/// Chat metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Chat store for owner-scoped CRUD operations
pub struct ChatStore<'a> {
    db: &'a Database,
}

impl<'a> ChatStore<'a> {
    /// Create a new chat store with database reference
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a new chat owned by `user_id`
    pub fn create_chat(&self, user_id: &str, title: &str) -> Result<ChatRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        self.db.conn().execute(
            "INSERT INTO chats (id, user_id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, user_id, title, now_str],
        )?;

        Ok(ChatRecord {
            id,
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// List chats owned by `user_id`, most recently updated first
    pub fn list_chats(&self, user_id: &str) -> Result<Vec<ChatRecord>> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, title, created_at, updated_at FROM chats
             WHERE user_id = ?1
             ORDER BY updated_at DESC",
        )?;
        let chats = stmt
            .query_map([user_id], Self::map_chat_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(chats)
    }

    /// Get a single chat, if it exists and belongs to `user_id`
    pub fn get_chat(&self, user_id: &str, chat_id: &str) -> Result<Option<ChatRecord>> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, title, created_at, updated_at FROM chats
             WHERE id = ?1 AND user_id = ?2",
        )?;
        let mut rows = stmt.query_map(params![chat_id, user_id], Self::map_chat_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Update a chat's title; returns false when no owned chat matched
    pub fn update_title(&self, user_id: &str, chat_id: &str, title: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let updated = self.db.conn().execute(
            "UPDATE chats SET title = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
            params![title, now, chat_id, user_id],
        )?;
        Ok(updated > 0)
    }

    /// Delete a chat and, via cascade, its messages
    ///
    /// Returns false when no owned chat matched.
    pub fn delete_chat(&self, user_id: &str, chat_id: &str) -> Result<bool> {
        let deleted = self.db.conn().execute(
            "DELETE FROM chats WHERE id = ?1 AND user_id = ?2",
            params![chat_id, user_id],
        )?;
        Ok(deleted > 0)
    }

    fn map_chat_row(row: &rusqlite::Row) -> rusqlite::Result<ChatRecord> {
        let created_at: String = row.get(2)?;
        let updated_at: String = row.get(3)?;
        Ok(ChatRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
