use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use portfolio_manager::{Alert, AlertUpdate, AlertWithPrice, NewAlert, TriggeredAlert};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthUser;
use crate::portfolio_routes::MessageResponse;
use crate::{jobs, ApiResponse, AppError, AppState};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAlertsQuery {
    /// Only active alerts (default true)
    pub active_only: Option<bool>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CreateAlertQuery {
    pub card_name: String,
    /// Threshold price, > 0
    pub target_price: f64,
    /// "above" or "below"
    pub alert_type: String,
    pub notes: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UpdateAlertQuery {
    pub card_name: Option<String>,
    pub target_price: Option<f64>,
    pub alert_type: Option<String>,
    pub is_active: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AlertsResponse {
    pub alerts: Vec<AlertWithPrice>,
}

#[derive(Serialize, ToSchema)]
pub struct TriggeredAlertsResponse {
    pub triggered_alerts: Vec<TriggeredAlert>,
}

pub fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(get_alerts).post(create_alert))
        .route("/alerts/check", post(check_alerts))
        .route("/alerts/:id", put(update_alert).delete(delete_alert))
}

/// The caller's alerts with current prices
#[utoipa::path(
    get,
    path = "/alerts",
    params(ListAlertsQuery),
    responses((status = 200, description = "Alerts", body = AlertsResponse)),
    security(("bearer_auth" = [])),
    tag = "Alerts"
)]
pub async fn get_alerts(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListAlertsQuery>,
) -> Result<Json<ApiResponse<AlertsResponse>>, AppError> {
    let alerts = state
        .alert_manager
        .get_alerts_with_prices(
            &user.user_id,
            query.active_only.unwrap_or(true),
            &state.price_tracker,
        )
        .await?;

    Ok(Json(ApiResponse::success(AlertsResponse { alerts })))
}

/// Create a price alert
#[utoipa::path(
    post,
    path = "/alerts",
    params(CreateAlertQuery),
    responses(
        (status = 200, description = "Created alert", body = Alert),
        (status = 400, description = "Non-positive target or unknown alert type")
    ),
    security(("bearer_auth" = [])),
    tag = "Alerts"
)]
pub async fn create_alert(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CreateAlertQuery>,
) -> Result<Json<ApiResponse<Alert>>, AppError> {
    let alert = state
        .alert_manager
        .create_alert(
            &user.user_id,
            user.email.as_deref(),
            NewAlert {
                card_name: query.card_name,
                target_price: query.target_price,
                alert_type: query.alert_type,
                notes: query.notes,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(alert)))
}

/// Change any subset of an alert's fields
#[utoipa::path(
    put,
    path = "/alerts/{id}",
    params(("id" = i64, Path, description = "Alert id"), UpdateAlertQuery),
    responses(
        (status = 200, description = "Updated alert", body = Alert),
        (status = 404, description = "Alert not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Alerts"
)]
pub async fn update_alert(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Query(query): Query<UpdateAlertQuery>,
) -> Result<Json<ApiResponse<Alert>>, AppError> {
    let update = AlertUpdate {
        card_name: query.card_name,
        target_price: query.target_price,
        alert_type: query.alert_type,
        is_active: query.is_active,
        notes: query.notes,
    };

    let alert = state
        .alert_manager
        .update_alert(&user.user_id, id, update)
        .await?
        .ok_or_else(|| AppError::not_found("Alert not found"))?;

    Ok(Json(ApiResponse::success(alert)))
}

#[utoipa::path(
    delete,
    path = "/alerts/{id}",
    params(("id" = i64, Path, description = "Alert id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Alert not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Alerts"
)]
pub async fn delete_alert(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    if !state.alert_manager.delete_alert(&user.user_id, id).await? {
        return Err(AppError::not_found("Alert not found"));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Alert deleted successfully".to_string(),
    })))
}

/// Check every active alert now and notify owners of the ones that fired
#[utoipa::path(
    post,
    path = "/alerts/check",
    responses((status = 200, description = "Alerts that fired", body = TriggeredAlertsResponse)),
    security(("bearer_auth" = [])),
    tag = "Alerts"
)]
pub async fn check_alerts(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<TriggeredAlertsResponse>>, AppError> {
    let triggered_alerts = jobs::run_alert_check(&state).await?;
    Ok(Json(ApiResponse::success(TriggeredAlertsResponse { triggered_alerts })))
}
