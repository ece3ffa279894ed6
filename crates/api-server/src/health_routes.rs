use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{ApiResponse, AppError, AppState, API_VERSION, SERVICE_NAME};

#[derive(Serialize, ToSchema)]
pub struct ServiceInfo {
    pub status: String,
    pub service: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
    pub ebay_api: String,
    pub reddit_api: String,
    pub news_api: String,
    pub email: String,
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

fn configured(yes: bool) -> String {
    if yes { "configured" } else { "not configured" }.to_string()
}

/// Service banner with the main endpoints
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service information", body = ServiceInfo)),
    tag = "Health"
)]
pub async fn root() -> Result<Json<ApiResponse<ServiceInfo>>, AppError> {
    let endpoints = [
        ("prices", "/prices?card={query}"),
        ("sentiment", "/sentiment/{card_name}"),
        ("forecast", "/forecast/{card_name}?days={days}"),
        ("portfolio", "/portfolio"),
        ("alerts", "/alerts"),
        ("listings", "/api/listings?card_name={query}"),
        ("docs", "/docs"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Ok(Json(ApiResponse::success(ServiceInfo {
        status: "online".to_string(),
        service: SERVICE_NAME.to_string(),
        version: API_VERSION.to_string(),
        endpoints,
    })))
}

/// Which backing services are reachable or configured
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Dependency status", body = HealthStatus)),
    tag = "Health"
)]
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HealthStatus>>, AppError> {
    let database = if state.db.ping().await {
        "connected"
    } else {
        "unavailable"
    };

    Ok(Json(ApiResponse::success(HealthStatus {
        status: "healthy".to_string(),
        database: database.to_string(),
        ebay_api: configured(state.price_tracker.ebay().is_configured()),
        reddit_api: configured(state.sentiment.reddit_configured()),
        news_api: configured(state.sentiment.news_configured()),
        email: configured(state.notifier.is_enabled()),
    })))
}
