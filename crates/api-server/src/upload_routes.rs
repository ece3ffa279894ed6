use std::path::Path;

use anyhow::Context;
use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use portfolio_manager::{NewCard, DEFAULT_CONDITION};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::{AppError, AppState};

const DEFAULT_CARD_YEAR: i32 = 2023;

#[derive(Debug, Deserialize)]
struct CardMetadata {
    #[serde(default)]
    player: String,
    #[serde(default = "default_year")]
    year: i32,
    #[serde(default)]
    set: String,
}

fn default_year() -> i32 {
    DEFAULT_CARD_YEAR
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub card_id: i64,
    pub image_url: String,
    pub estimated_price: f64,
    pub message: String,
}

/// Multipart body of `POST /api/upload-card` as published in the OpenAPI
/// document. `upload_card` reads these fields from `Multipart` itself, so
/// the type only feeds `ToSchema` and is never constructed.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    /// JSON: `{"player": "...", "year": 2023, "set": "..."}`
    metadata: String,
}

struct ImageUpload {
    bytes: Vec<u8>,
    content_type: String,
}

pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/api/upload-card", post(upload_card))
}

/// Store a card photo, estimate its price and add it to the caller's portfolio.
///
/// Multipart fields: `file` (image/*) and `metadata`, a JSON object
/// `{"player": "...", "year": 2023, "set": "..."}`.
#[utoipa::path(
    post,
    path = "/api/upload-card",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Card added", body = UploadResponse),
        (status = 400, description = "Missing file, non-image file or bad metadata"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Portfolio"
)]
pub async fn upload_card(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut image: Option<ImageUpload> = None;
    let mut metadata: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(format!("Failed to read file: {}", e)))?;
                image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    content_type,
                });
            }
            Some("metadata") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Invalid metadata format"))?;
                metadata = Some(text);
            }
            _ => {}
        }
    }

    let metadata = metadata.ok_or_else(|| AppError::bad_request("metadata is required"))?;
    let metadata: CardMetadata = serde_json::from_str(&metadata)
        .map_err(|_| AppError::bad_request("Invalid metadata format"))?;
    let player = metadata.player.trim();
    let card_set = metadata.set.trim();
    if player.is_empty() {
        return Err(AppError::bad_request("Player name is required"));
    }

    let image = image.ok_or_else(|| AppError::bad_request("file is required"))?;
    if !image.content_type.starts_with("image/") {
        return Err(AppError::bad_request("File must be an image"));
    }
    if image.bytes.is_empty() {
        return Err(AppError::bad_request("File is empty"));
    }

    let user_dir = sanitize_segment(&user.user_id);
    let file_name = image_file_name(&image, player, metadata.year, card_set);
    let dir = state.config.upload_dir.join(&user_dir);
    let path = dir.join(&file_name);

    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    tokio::fs::write(&path, &image.bytes)
        .await
        .with_context(|| format!("Failed to store {}", path.display()))?;
    let image_url = format!("/uploads/{}/{}", user_dir, file_name);

    let estimated_price = estimate_price(&state, player, metadata.year, card_set).await;
    let card_name = format!("{} {} {}", player, metadata.year, card_set)
        .trim()
        .to_string();

    let card = NewCard {
        card_name: card_name.clone(),
        buy_price: estimated_price,
        quantity: 1,
        condition: Some(DEFAULT_CONDITION.to_string()),
        purchase_date: None,
        notes: Some(format!("Scanned card - Image: {}", image_url)),
    };

    let entry = match state
        .portfolio_manager
        .add_scanned_card(&user.user_id, card)
        .await
    {
        Ok(entry) => entry,
        Err(e) => {
            remove_quietly(&path).await;
            return Err(e.context("Failed to save card to portfolio").into());
        }
    };

    tracing::info!(
        "Scanned card {} added for user {} (estimate ${:.2})",
        card_name,
        user.user_id,
        estimated_price
    );

    Ok(Json(UploadResponse {
        success: true,
        card_id: entry.id,
        image_url,
        estimated_price,
        message: format!("Successfully added {} to portfolio", card_name),
    }))
}

/// eBay estimate when a call is configured and within budget, else 0.
async fn estimate_price(state: &AppState, player: &str, year: i32, card_set: &str) -> f64 {
    if !state.price_tracker.ebay().is_configured() {
        return 0.0;
    }
    if !state.price_tracker.rate_limiter().check_and_increment().await {
        tracing::warn!("eBay daily limit reached, skipping estimate for {}", player);
        return 0.0;
    }
    state
        .price_tracker
        .ebay()
        .estimate_price(player, year, card_set)
        .await
        .unwrap_or(0.0)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

/// Content-hash prefix plus `Player_year_set`, so re-uploads of the same
/// card with different photos never overwrite each other.
fn image_file_name(image: &ImageUpload, player: &str, year: i32, card_set: &str) -> String {
    let digest = hex::encode(Sha256::digest(&image.bytes));
    let stem = sanitize_segment(&format!("{}_{}_{}", player, year, card_set));
    format!(
        "{}_{}.{}",
        &digest[..12],
        stem,
        extension_for(&image.content_type)
    )
}

/// Keep ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("user_123"), "user_123");
        assert_eq!(sanitize_segment("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_segment("LeBron James"), "LeBron_James");
        assert_eq!(sanitize_segment("  "), "anonymous");
    }

    #[test]
    fn test_image_file_name() {
        let image = ImageUpload {
            bytes: b"fake png".to_vec(),
            content_type: "image/png".to_string(),
        };
        let name = image_file_name(&image, "Victor Wembanyama", 2023, "Prizm");
        assert!(name.ends_with("_Victor_Wembanyama_2023_Prizm.png"));
        assert_eq!(name.split('_').next().map(str::len), Some(12));
    }

    #[test]
    fn test_upload_form_schema_lists_multipart_fields() {
        let schema = serde_json::to_value(<UploadForm as utoipa::PartialSchema>::schema()).unwrap();
        assert_eq!(schema["properties"]["file"]["format"], "binary");
        assert_eq!(schema["properties"]["metadata"]["type"], "string");
    }

    #[test]
    fn test_metadata_defaults() {
        let meta: CardMetadata = serde_json::from_str(r#"{"player":"Luka"}"#).unwrap();
        assert_eq!(meta.year, 2023);
        assert_eq!(meta.set, "");
    }
}
