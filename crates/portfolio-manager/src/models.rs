use card_core::AlertDirection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Condition recorded when none is given
pub const DEFAULT_CONDITION: &str = "Raw";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PortfolioEntry {
    pub id: i64,
    pub user_id: String,
    pub card_name: String,
    pub buy_price: f64,
    pub quantity: i64,
    pub condition: Option<String>,
    pub purchase_date: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCard {
    pub card_name: String,
    pub buy_price: f64,
    pub quantity: i64,
    pub condition: Option<String>,
    /// YYYY-MM-DD
    pub purchase_date: Option<String>,
    pub notes: Option<String>,
}

/// A holding valued at the current market price
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PortfolioCard {
    pub id: i64,
    pub card_name: String,
    pub buy_price: f64,
    pub current_price: f64,
    pub quantity: i64,
    pub condition: String,
    pub total_investment: f64,
    pub current_value: f64,
    pub roi_percentage: f64,
    pub purchase_date: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PortfolioSummary {
    pub total_investment: f64,
    pub total_value: f64,
    pub total_roi_percentage: f64,
    pub card_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Alert {
    pub id: i64,
    pub user_id: String,
    pub user_email: Option<String>,
    pub card_name: String,
    pub target_price: f64,
    #[sqlx(try_from = "String")]
    pub alert_type: AlertDirection,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: String,
    pub last_triggered: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlert {
    pub card_name: String,
    pub target_price: f64,
    pub alert_type: String,
    pub notes: Option<String>,
}

/// Partial alert update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AlertUpdate {
    pub card_name: Option<String>,
    pub target_price: Option<f64>,
    pub alert_type: Option<String>,
    pub is_active: Option<bool>,
    pub notes: Option<String>,
}

impl AlertUpdate {
    pub fn is_empty(&self) -> bool {
        self.card_name.is_none()
            && self.target_price.is_none()
            && self.alert_type.is_none()
            && self.is_active.is_none()
            && self.notes.is_none()
    }
}

/// An alert together with the price it is currently compared against
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AlertWithPrice {
    #[serde(flatten)]
    pub alert: Alert,
    pub current_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TriggeredAlert {
    pub id: i64,
    pub user_id: String,
    pub user_email: Option<String>,
    pub card_name: String,
    pub target_price: f64,
    pub current_price: f64,
    pub alert_type: AlertDirection,
    pub triggered_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct NotificationPreferences {
    pub id: i64,
    pub email: String,
    pub email_notifications_enabled: bool,
    pub push_notifications_enabled: bool,
    pub alert_trigger_notifications: bool,
    pub weekly_summary_enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl NotificationPreferences {
    pub fn wants_alert_emails(&self) -> bool {
        self.email_notifications_enabled && self.alert_trigger_notifications
    }
}

fn default_true() -> bool {
    true
}

/// Create-or-replace payload for notification preferences
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PreferencesInput {
    pub email: String,
    #[serde(default = "default_true")]
    pub email_notifications_enabled: bool,
    #[serde(default)]
    pub push_notifications_enabled: bool,
    #[serde(default = "default_true")]
    pub alert_trigger_notifications: bool,
    #[serde(default)]
    pub weekly_summary_enabled: bool,
}

impl PreferencesInput {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            email_notifications_enabled: true,
            push_notifications_enabled: false,
            alert_trigger_notifications: true,
            weekly_summary_enabled: false,
        }
    }
}
