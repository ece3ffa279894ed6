use crate::db::PortfolioDb;
use crate::models::*;
use crate::portfolio::is_positive_price;
use anyhow::Result;
use card_core::{now_timestamp, AlertDirection, CardError, PriceSource};

pub struct AlertManager {
    db: PortfolioDb,
}

impl AlertManager {
    pub fn new(db: PortfolioDb) -> Self {
        Self { db }
    }

    pub async fn create_alert(
        &self,
        user_id: &str,
        user_email: Option<&str>,
        alert: NewAlert,
    ) -> Result<Alert> {
        if alert.card_name.trim().is_empty() {
            return Err(CardError::InvalidInput("card_name is required".to_string()).into());
        }
        if !is_positive_price(alert.target_price) {
            return Err(
                CardError::InvalidInput("Target price must be positive".to_string()).into(),
            );
        }
        let direction = AlertDirection::parse(&alert.alert_type)?;

        let created = sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts (user_id, user_email, card_name, target_price, alert_type,
                                is_active, notes, created_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(user_email)
        .bind(alert.card_name.trim())
        .bind(alert.target_price)
        .bind(direction.as_str())
        .bind(&alert.notes)
        .bind(now_timestamp())
        .fetch_one(self.db.pool())
        .await?;

        tracing::info!(
            "Created alert {} for {}: {} ${}",
            created.id,
            created.card_name,
            direction,
            created.target_price
        );
        Ok(created)
    }

    pub async fn get_alert(&self, user_id: &str, id: i64) -> Result<Option<Alert>> {
        let alert = sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(alert)
    }

    /// Newest first
    pub async fn get_alerts(&self, user_id: &str, active_only: bool) -> Result<Vec<Alert>> {
        let query = if active_only {
            "SELECT * FROM alerts WHERE user_id = ? AND is_active = 1 ORDER BY created_at DESC, id DESC"
        } else {
            "SELECT * FROM alerts WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        };

        let alerts = sqlx::query_as::<_, Alert>(query)
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;

        Ok(alerts)
    }

    /// Alerts with the price they are currently compared against.
    /// `current_price` is `None` when the lookup fails.
    pub async fn get_alerts_with_prices(
        &self,
        user_id: &str,
        active_only: bool,
        prices: &dyn PriceSource,
    ) -> Result<Vec<AlertWithPrice>> {
        let alerts = self.get_alerts(user_id, active_only).await?;

        let mut enriched = Vec::with_capacity(alerts.len());
        for alert in alerts {
            let current_price = prices.current_price(&alert.card_name).await.ok();
            enriched.push(AlertWithPrice {
                alert,
                current_price,
            });
        }

        Ok(enriched)
    }

    /// Partial update. `None` when the alert does not exist for this user.
    pub async fn update_alert(
        &self,
        user_id: &str,
        id: i64,
        update: AlertUpdate,
    ) -> Result<Option<Alert>> {
        let Some(existing) = self.get_alert(user_id, id).await? else {
            return Ok(None);
        };
        if update.is_empty() {
            return Ok(Some(existing));
        }

        if let Some(price) = update.target_price {
            if !is_positive_price(price) {
                return Err(
                    CardError::InvalidInput("Target price must be positive".to_string()).into(),
                );
            }
        }
        let direction = match update.alert_type.as_deref() {
            Some(t) => AlertDirection::parse(t)?,
            None => existing.alert_type,
        };
        let card_name = match update.card_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            Some(_) => {
                return Err(CardError::InvalidInput("card_name is required".to_string()).into())
            }
            None => existing.card_name,
        };

        let updated = sqlx::query_as::<_, Alert>(
            r#"
            UPDATE alerts
            SET card_name = ?, target_price = ?, alert_type = ?, is_active = ?, notes = ?
            WHERE id = ? AND user_id = ?
            RETURNING *
            "#,
        )
        .bind(card_name)
        .bind(update.target_price.unwrap_or(existing.target_price))
        .bind(direction.as_str())
        .bind(update.is_active.unwrap_or(existing.is_active))
        .bind(update.notes.or(existing.notes))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(updated)
    }

    pub async fn delete_alert(&self, user_id: &str, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM alerts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every active alert, across users
    async fn active_alerts(&self) -> Result<Vec<Alert>> {
        let alerts = sqlx::query_as::<_, Alert>(
            "SELECT * FROM alerts WHERE is_active = 1 ORDER BY id",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(alerts)
    }

    /// Evaluate active alerts against current prices. Triggered alerts are
    /// stamped and deactivated so they fire once.
    pub async fn check_alerts(&self, prices: &dyn PriceSource) -> Result<Vec<TriggeredAlert>> {
        let alerts = self.active_alerts().await?;
        let mut triggered = Vec::new();

        for alert in alerts {
            let current_price = match prices.current_price(&alert.card_name).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::warn!("Skipping alert {}: price lookup failed: {}", alert.id, e);
                    continue;
                }
            };

            if !alert.alert_type.is_triggered(current_price, alert.target_price) {
                continue;
            }

            let triggered_at = now_timestamp();
            sqlx::query("UPDATE alerts SET is_active = 0, last_triggered = ? WHERE id = ?")
                .bind(&triggered_at)
                .bind(alert.id)
                .execute(self.db.pool())
                .await?;

            tracing::info!(
                "Alert {} triggered: {} at ${} ({} ${})",
                alert.id,
                alert.card_name,
                current_price,
                alert.alert_type,
                alert.target_price
            );

            triggered.push(TriggeredAlert {
                id: alert.id,
                user_id: alert.user_id,
                user_email: alert.user_email,
                card_name: alert.card_name,
                target_price: alert.target_price,
                current_price,
                alert_type: alert.alert_type,
                triggered_at,
            });
        }

        Ok(triggered)
    }
}
