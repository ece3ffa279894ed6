use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use portfolio_manager::{NotificationPreferences, PreferencesInput};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::portfolio_routes::MessageResponse;
use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct PreferencesUpdated {
    pub message: String,
    pub preferences: NotificationPreferences,
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications/preferences",
            get(get_preferences)
                .post(update_preferences)
                .delete(delete_preferences),
        )
        .route("/notifications/test", post(send_test_notification))
}

#[utoipa::path(
    get,
    path = "/notifications/preferences",
    params(EmailQuery),
    responses(
        (status = 200, description = "Stored preferences", body = NotificationPreferences),
        (status = 404, description = "No preferences for this email")
    ),
    tag = "Notifications"
)]
pub async fn get_preferences(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<ApiResponse<NotificationPreferences>>, AppError> {
    let prefs = state
        .preferences
        .get(&query.email)
        .await?
        .ok_or_else(|| AppError::not_found("Notification preferences not found"))?;
    Ok(Json(ApiResponse::success(prefs)))
}

/// Create or replace the preferences for an email address
#[utoipa::path(
    post,
    path = "/notifications/preferences",
    request_body = PreferencesInput,
    responses(
        (status = 200, description = "Saved", body = PreferencesUpdated),
        (status = 400, description = "Missing email")
    ),
    tag = "Notifications"
)]
pub async fn update_preferences(
    State(state): State<AppState>,
    Json(input): Json<PreferencesInput>,
) -> Result<Json<ApiResponse<PreferencesUpdated>>, AppError> {
    let preferences = state.preferences.upsert(input).await?;
    Ok(Json(ApiResponse::success(PreferencesUpdated {
        message: "Notification preferences updated successfully".to_string(),
        preferences,
    })))
}

#[utoipa::path(
    delete,
    path = "/notifications/preferences",
    params(EmailQuery),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "No preferences for this email")
    ),
    tag = "Notifications"
)]
pub async fn delete_preferences(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    if !state.preferences.delete(&query.email).await? {
        return Err(AppError::not_found("Notification preferences not found"));
    }
    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Notification preferences deleted successfully".to_string(),
    })))
}

/// Send a test email through the configured channel
#[utoipa::path(
    post,
    path = "/notifications/test",
    params(EmailQuery),
    responses(
        (status = 200, description = "Sent", body = MessageResponse),
        (status = 500, description = "No channel configured or delivery failed")
    ),
    tag = "Notifications"
)]
pub async fn send_test_notification(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    let email = query.email.trim();
    if email.is_empty() {
        return Err(AppError::bad_request("email is required"));
    }

    if !state.notifier.send_test(email).await {
        return Err(AppError::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            anyhow::anyhow!("Failed to send test notification"),
        ));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Test notification sent successfully".to_string(),
    })))
}
