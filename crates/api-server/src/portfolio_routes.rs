use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use portfolio_manager::{summarize, NewCard, PortfolioCard, PortfolioSummary};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthUser;
use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AddCardQuery {
    pub card_name: String,
    /// Price paid per card, > 0
    pub purchase_price: f64,
    /// Number of cards, > 0 (default 1)
    pub quantity: Option<i64>,
    /// e.g. "PSA 10" or "Raw" (default)
    pub condition: Option<String>,
    /// YYYY-MM-DD
    pub purchase_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PortfolioResponse {
    pub portfolio: Vec<PortfolioCard>,
    pub summary: PortfolioSummary,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

pub fn portfolio_routes() -> Router<AppState> {
    Router::new()
        .route("/portfolio", get(get_portfolio).post(add_card))
        .route("/portfolio/export", get(export_portfolio))
        .route("/portfolio/:id", delete(delete_card))
}

/// The caller's cards valued at current prices, with totals
#[utoipa::path(
    get,
    path = "/portfolio",
    responses(
        (status = 200, description = "Portfolio with ROI", body = PortfolioResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Portfolio"
)]
pub async fn get_portfolio(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<PortfolioResponse>>, AppError> {
    let portfolio = state
        .portfolio_manager
        .get_portfolio(&user.user_id, &state.price_tracker)
        .await?;
    let summary = summarize(&portfolio);

    Ok(Json(ApiResponse::success(PortfolioResponse { portfolio, summary })))
}

/// Add a purchased card
#[utoipa::path(
    post,
    path = "/portfolio",
    params(AddCardQuery),
    responses(
        (status = 200, description = "The added card, valued", body = PortfolioCard),
        (status = 400, description = "Non-positive price or quantity, or bad date")
    ),
    security(("bearer_auth" = [])),
    tag = "Portfolio"
)]
pub async fn add_card(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AddCardQuery>,
) -> Result<Json<ApiResponse<PortfolioCard>>, AppError> {
    let card = NewCard {
        card_name: query.card_name,
        buy_price: query.purchase_price,
        quantity: query.quantity.unwrap_or(1),
        condition: query.condition,
        purchase_date: query.purchase_date,
        notes: query.notes,
    };

    let added = state
        .portfolio_manager
        .add_card(&user.user_id, card, &state.price_tracker)
        .await?;
    Ok(Json(ApiResponse::success(added)))
}

/// Remove one of the caller's cards
#[utoipa::path(
    delete,
    path = "/portfolio/{id}",
    params(("id" = i64, Path, description = "Portfolio entry id")),
    responses(
        (status = 200, description = "Removed", body = MessageResponse),
        (status = 404, description = "No such card for this user")
    ),
    security(("bearer_auth" = [])),
    tag = "Portfolio"
)]
pub async fn delete_card(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    if !state.portfolio_manager.delete_card(&user.user_id, id).await? {
        return Err(AppError::not_found("Card not found"));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Card removed from portfolio".to_string(),
    })))
}

/// Portfolio as a CSV download
#[utoipa::path(
    get,
    path = "/portfolio/export",
    responses((status = 200, description = "portfolio.csv", content_type = "text/csv", body = String)),
    security(("bearer_auth" = [])),
    tag = "Portfolio"
)]
pub async fn export_portfolio(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    let csv = state
        .portfolio_manager
        .export_csv(&user.user_id, &state.price_tracker)
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=portfolio.csv"),
        ],
        csv,
    )
        .into_response())
}
