use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use sentiment_analysis::SentimentReport;

use crate::{ApiResponse, AppError, AppState};

pub fn sentiment_routes() -> Router<AppState> {
    Router::new().route("/sentiment/:card_name", get(get_sentiment))
}

/// Reddit and news sentiment with a 0-100 Flip Score
#[utoipa::path(
    get,
    path = "/sentiment/{card_name}",
    params(("card_name" = String, Path, description = "Card name")),
    responses((status = 200, description = "Sentiment report", body = SentimentReport)),
    tag = "Sentiment"
)]
pub async fn get_sentiment(
    State(state): State<AppState>,
    Path(card_name): Path<String>,
) -> Result<Json<ApiResponse<SentimentReport>>, AppError> {
    let report = state.sentiment.analyze(&card_name).await?;
    Ok(Json(ApiResponse::success(report)))
}
