use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use card_core::Listing;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{ApiResponse, AppError, AppState};

const DEFAULT_LISTING_LIMIT: usize = 20;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingsQuery {
    pub card_name: String,
    /// At most 100 (default 20)
    pub limit: Option<usize>,
}

#[derive(Serialize, ToSchema)]
pub struct ListingsResponse {
    pub listings: Vec<Listing>,
}

pub fn listing_routes() -> Router<AppState> {
    Router::new().route("/api/listings", get(get_listings))
}

/// Active eBay auctions for a card, ending soonest first
#[utoipa::path(
    get,
    path = "/api/listings",
    params(ListingsQuery),
    responses(
        (status = 200, description = "Active auctions", body = ListingsResponse),
        (status = 400, description = "Limit above 100"),
        (status = 429, description = "Daily eBay call budget exhausted")
    ),
    tag = "Prices"
)]
pub async fn get_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<ApiResponse<ListingsResponse>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LISTING_LIMIT);
    let listings = state
        .price_tracker
        .get_listings(&query.card_name, limit)
        .await?;
    Ok(Json(ApiResponse::success(ListingsResponse { listings })))
}
