use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use price_tracker::{forecast::DEFAULT_FORECAST_DAYS, Forecast};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ForecastQuery {
    /// Days ahead, 1-30 (default 7)
    pub days: Option<u32>,
}

pub fn forecast_routes() -> Router<AppState> {
    Router::new().route("/forecast/:card_name", get(get_forecast))
}

/// Linear price forecast from recent sales
#[utoipa::path(
    get,
    path = "/forecast/{card_name}",
    params(("card_name" = String, Path, description = "Card name"), ForecastQuery),
    responses(
        (status = 200, description = "Daily predictions and trend", body = Forecast),
        (status = 400, description = "Days out of range or too little price history")
    ),
    tag = "Prices"
)]
pub async fn get_forecast(
    State(state): State<AppState>,
    Path(card_name): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ApiResponse<Forecast>>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_FORECAST_DAYS);
    let forecast = state
        .price_tracker
        .forecast(&card_name.replace('-', " "), days)
        .await?;
    Ok(Json(ApiResponse::success(forecast)))
}
