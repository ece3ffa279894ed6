use crate::db::PortfolioDb;
use crate::models::{NotificationPreferences, PreferencesInput};
use anyhow::Result;
use card_core::{now_timestamp, CardError};

/// Per-email notification settings
pub struct PreferencesManager {
    db: PortfolioDb,
}

impl PreferencesManager {
    pub fn new(db: PortfolioDb) -> Self {
        Self { db }
    }

    pub async fn get(&self, email: &str) -> Result<Option<NotificationPreferences>> {
        let prefs = sqlx::query_as::<_, NotificationPreferences>(
            "SELECT * FROM notification_preferences WHERE email = ?",
        )
        .bind(email.trim())
        .fetch_optional(self.db.pool())
        .await?;

        Ok(prefs)
    }

    /// Create or replace the settings for `input.email`
    pub async fn upsert(&self, input: PreferencesInput) -> Result<NotificationPreferences> {
        let email = input.email.trim();
        if email.is_empty() {
            return Err(CardError::InvalidInput("Email is required".to_string()).into());
        }
        let now = now_timestamp();

        let prefs = sqlx::query_as::<_, NotificationPreferences>(
            r#"
            INSERT INTO notification_preferences (
                email, email_notifications_enabled, push_notifications_enabled,
                alert_trigger_notifications, weekly_summary_enabled, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                email_notifications_enabled = excluded.email_notifications_enabled,
                push_notifications_enabled = excluded.push_notifications_enabled,
                alert_trigger_notifications = excluded.alert_trigger_notifications,
                weekly_summary_enabled = excluded.weekly_summary_enabled,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(input.email_notifications_enabled)
        .bind(input.push_notifications_enabled)
        .bind(input.alert_trigger_notifications)
        .bind(input.weekly_summary_enabled)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.db.pool())
        .await?;

        tracing::info!("Saved notification preferences for {}", email);
        Ok(prefs)
    }

    pub async fn delete(&self, email: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notification_preferences WHERE email = ?")
            .bind(email.trim())
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn manager() -> PreferencesManager {
        PreferencesManager::new(PortfolioDb::new("sqlite::memory:").await.unwrap())
    }

    #[tokio::test]
    async fn test_upsert_creates_with_defaults() {
        let prefs = manager().await;
        let saved = prefs.upsert(PreferencesInput::new("fan@example.com")).await.unwrap();

        assert!(saved.email_notifications_enabled);
        assert!(!saved.push_notifications_enabled);
        assert!(saved.alert_trigger_notifications);
        assert!(!saved.weekly_summary_enabled);
        assert!(saved.wants_alert_emails());
    }

    #[tokio::test]
    async fn test_upsert_updates_existing_row() {
        let prefs = manager().await;
        let first = prefs.upsert(PreferencesInput::new("fan@example.com")).await.unwrap();

        let mut input = PreferencesInput::new("fan@example.com");
        input.alert_trigger_notifications = false;
        let second = prefs.upsert(input).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert!(!second.wants_alert_emails());
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let prefs = manager().await;
        assert!(prefs.get("nobody@example.com").await.unwrap().is_none());

        prefs.upsert(PreferencesInput::new("fan@example.com")).await.unwrap();
        assert!(prefs.get("fan@example.com").await.unwrap().is_some());

        assert!(prefs.delete("fan@example.com").await.unwrap());
        assert!(!prefs.delete("fan@example.com").await.unwrap());
    }

    #[test]
    fn test_input_defaults_from_json() {
        let input: PreferencesInput =
            serde_json::from_str(r#"{"email": "fan@example.com"}"#).unwrap();
        assert!(input.email_notifications_enabled);
        assert!(!input.push_notifications_enabled);
        assert!(input.alert_trigger_notifications);
        assert!(!input.weekly_summary_enabled);
    }

    #[tokio::test]
    async fn test_empty_email_rejected() {
        let prefs = manager().await;
        assert!(prefs.upsert(PreferencesInput::new("  ")).await.is_err());
    }
}
