use std::time::Duration;

use anyhow::Result;
use notification_service::PriceAlertEmail;
use portfolio_manager::TriggeredAlert;
use tokio::task::JoinHandle;

use crate::AppState;

const CACHE_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Evaluate every active alert and email the owners who opted in.
pub async fn run_alert_check(state: &AppState) -> Result<Vec<TriggeredAlert>> {
    let triggered = state.alert_manager.check_alerts(&state.price_tracker).await?;

    if !triggered.is_empty() {
        tracing::info!("{} alert(s) triggered", triggered.len());
    }
    for alert in &triggered {
        notify_triggered(state, alert).await;
    }

    Ok(triggered)
}

/// Sends only when preferences exist for the recipient and both email and
/// alert-trigger notifications are on. Never fails the caller.
async fn notify_triggered(state: &AppState, alert: &TriggeredAlert) {
    let Some(email) = alert
        .user_email
        .clone()
        .or_else(|| state.config.default_user_email.clone())
    else {
        tracing::debug!("Alert {} has no recipient email, skipping notification", alert.id);
        return;
    };

    let prefs = match state.preferences.get(&email).await {
        Ok(Some(prefs)) => prefs,
        Ok(None) => {
            tracing::debug!("No notification preferences for {}, skipping", email);
            return;
        }
        Err(e) => {
            tracing::error!("Failed to load notification preferences for {}: {}", email, e);
            return;
        }
    };
    if !prefs.wants_alert_emails() {
        tracing::debug!("Alert emails disabled for {}", email);
        return;
    }

    let message = PriceAlertEmail {
        card_name: alert.card_name.clone(),
        target_price: alert.target_price,
        alert_type: alert.alert_type,
        current_price: alert.current_price,
        triggered_at: alert.triggered_at.clone(),
    };
    if !state.notifier.send_price_alert(&email, &message).await {
        tracing::warn!("Price alert email for alert {} was not delivered", alert.id);
    }
}

/// Drop expired price-cache rows and sentiment reports.
pub async fn cleanup_caches(state: &AppState) {
    match state.price_tracker.cleanup_cache().await {
        Ok(0) => {}
        Ok(n) => tracing::info!("Removed {} expired price cache entries", n),
        Err(e) => tracing::error!("Price cache cleanup failed: {}", e),
    }
    let reports = state.sentiment.cleanup_expired();
    if reports > 0 {
        tracing::info!("Removed {} expired sentiment reports", reports);
    }
}

/// Hourly cache cleanup, plus the periodic alert check when
/// `ALERT_CHECK_INTERVAL_SECS` is set.
pub fn spawn_background_jobs(state: AppState) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    let cleanup_state = state.clone();
    handles.push(tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            cleanup_caches(&cleanup_state).await;
        }
    }));

    let every = state.config.alert_check_interval_secs;
    if every > 0 {
        tracing::info!("Checking price alerts every {} seconds", every);
        handles.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(every));
            // The first tick completes immediately; give the server a moment to start
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = run_alert_check(&state).await {
                    tracing::error!("Scheduled alert check failed: {}", e);
                }
            }
        }));
    }

    handles
}
