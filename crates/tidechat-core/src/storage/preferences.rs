//! Per-user preferences storage

use anyhow::Result;
use rusqlite::params;

use crate::ai::providers::ProviderId;

use super::database::Database;

/// User preferences manager
pub struct Preferences<'a> {
    db: &'a Database,
    user_id: String,
}

impl<'a> Preferences<'a> {
    /// Create a preferences manager for one user
    pub fn for_user(db: &'a Database, user_id: &str) -> Self {
        Self {
            db,
            user_id: user_id.to_string(),
        }
    }

    /// Get a preference value
    pub fn get(&self, key: &str) -> Option<String> {
        self.db
            .conn()
            .query_row(
                "SELECT value FROM user_preferences WHERE user_id = ?1 AND key = ?2",
                params![self.user_id, key],
                |row| row.get(0),
            )
            .ok()
    }

    /// Set a preference value
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db.conn().execute(
            "INSERT INTO user_preferences (user_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, strftime('%s', 'now'))
             ON CONFLICT(user_id, key) DO UPDATE SET value = ?3, updated_at = strftime('%s', 'now')",
            params![self.user_id, key, value],
        )?;
        Ok(())
    }

    /// Get the preferred completion provider (defaults to Gemini)
    pub fn get_model(&self) -> ProviderId {
        self.get("model")
            .and_then(|s| serde_json::from_value(serde_json::Value::String(s)).ok())
            .unwrap_or_default()
    }

    /// Save the preferred completion provider
    pub fn set_model(&self, model: ProviderId) -> Result<()> {
        match serde_json::to_value(model)? {
            serde_json::Value::String(name) => self.set("model", &name),
            other => anyhow::bail!("unexpected provider encoding: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::ai::providers::ProviderId;
    use crate::storage::Database;

    use super::Preferences;

    fn create_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::new(&temp_dir.path().join("test.db")).expect("Failed to create database");
        (db, temp_dir)
    }

    #[test]
    fn test_set_and_get() {
        let (db, _temp) = create_test_db();
        let prefs = Preferences::for_user(&db, "alice");

        assert_eq!(prefs.get("model"), None);
        prefs.set("model", "mistral").expect("set failed");
        assert_eq!(prefs.get("model").as_deref(), Some("mistral"));

        // Upsert replaces
        prefs.set("model", "gemini").expect("set failed");
        assert_eq!(prefs.get("model").as_deref(), Some("gemini"));
    }

    #[test]
    fn test_model_round_trip_and_default() {
        let (db, _temp) = create_test_db();
        let prefs = Preferences::for_user(&db, "alice");

        assert_eq!(prefs.get_model(), ProviderId::Gemini);
        prefs.set_model(ProviderId::Mistral).expect("set failed");
        assert_eq!(prefs.get_model(), ProviderId::Mistral);
    }

    #[test]
    fn test_preferences_isolated_per_user() {
        let (db, _temp) = create_test_db();
        Preferences::for_user(&db, "alice")
            .set_model(ProviderId::Mistral)
            .expect("set failed");

        assert_eq!(
            Preferences::for_user(&db, "bob").get_model(),
            ProviderId::Gemini
        );
    }
}
