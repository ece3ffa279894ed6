use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use price_tracker::PriceQuote;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PriceQuery {
    /// Search query, at least 3 characters (e.g. "Wembanyama Prizm")
    pub card: String,
}

pub fn price_routes() -> Router<AppState> {
    Router::new()
        .route("/prices", get(get_prices))
        .route("/prices/:card_name", get(get_prices_by_path))
}

/// Recent eBay sale prices for a card, cached for up to 90 days
#[utoipa::path(
    get,
    path = "/prices",
    params(PriceQuery),
    responses(
        (status = 200, description = "Price summary", body = PriceQuote),
        (status = 400, description = "Query shorter than 3 characters"),
        (status = 429, description = "Daily eBay call budget exhausted")
    ),
    tag = "Prices"
)]
pub async fn get_prices(
    State(state): State<AppState>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<ApiResponse<PriceQuote>>, AppError> {
    let quote = state.price_tracker.get_prices(&query.card).await?;
    Ok(Json(ApiResponse::success(quote)))
}

/// Same as `/prices`, with dashes in the path read as spaces
#[utoipa::path(
    get,
    path = "/prices/{card_name}",
    params(("card_name" = String, Path, description = "Card name, e.g. Wembanyama-Prizm")),
    responses((status = 200, description = "Price summary", body = PriceQuote)),
    tag = "Prices"
)]
pub async fn get_prices_by_path(
    State(state): State<AppState>,
    Path(card_name): Path<String>,
) -> Result<Json<ApiResponse<PriceQuote>>, AppError> {
    let query = card_name.replace('-', " ");
    let quote = state.price_tracker.get_prices(&query).await?;
    Ok(Json(ApiResponse::success(quote)))
}
