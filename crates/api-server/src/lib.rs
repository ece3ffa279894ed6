//! DimeDrop HTTP API: eBay prices, sentiment, forecasts, portfolios and
//! price alerts for basketball cards.

pub mod auth;
pub mod config;
pub mod jobs;
pub mod openapi;
pub mod request_id;
pub mod security_headers;

mod alert_routes;
mod forecast_routes;
mod health_routes;
mod listing_routes;
mod notification_routes;
mod portfolio_routes;
mod price_routes;
mod sentiment_routes;
mod upload_routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Json, Router,
};
use card_core::CardError;
use ebay_client::EbayClient;
use notification_service::NotificationService;
use portfolio_manager::{AlertManager, PortfolioDb, PortfolioManager, PreferencesManager};
use price_tracker::PriceTracker;
use sentiment_analysis::SentimentAnalyzer;
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use auth::{AuthUser, JwtVerifier};
pub use config::{load_environment, AppConfig};

pub const SERVICE_NAME: &str = "DimeDrop API";
pub const API_VERSION: &str = "1.0.0";

/// Largest accepted request body (card image uploads)
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: PortfolioDb,
    pub price_tracker: PriceTracker,
    pub sentiment: Arc<SentimentAnalyzer>,
    pub portfolio_manager: Arc<PortfolioManager>,
    pub alert_manager: Arc<AlertManager>,
    pub preferences: Arc<PreferencesManager>,
    pub notifier: Arc<NotificationService>,
    pub auth: Arc<JwtVerifier>,
}

impl AppState {
    /// Connect to the database and build every service from `config`.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let db = PortfolioDb::new(&config.database_url)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_url))?;
        price_tracker::init_schema(db.pool()).await?;

        let ebay = EbayClient::new(config.ebay.clone());
        let price_tracker = PriceTracker::new(db.pool().clone(), ebay, config.tracker.clone());
        let sentiment = SentimentAnalyzer::new(&config.sentiment);
        let notifier = NotificationService::new(&config.notifications);

        let auth = JwtVerifier::new(&config.auth);
        if !auth.is_verified() {
            tracing::warn!("AUTH_JWT_SECRET not set: JWT signatures are NOT verified (development mode)");
        }

        Ok(Self {
            portfolio_manager: Arc::new(PortfolioManager::new(db.clone())),
            alert_manager: Arc::new(AlertManager::new(db.clone())),
            preferences: Arc::new(PreferencesManager::new(db.clone())),
            db,
            price_tracker,
            sentiment: Arc::new(sentiment),
            notifier: Arc::new(notifier),
            auth: Arc::new(auth),
            config: Arc::new(config),
        })
    }
}

/// JSON envelope for every API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Handler error: an `anyhow::Error` plus the status to answer with.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

fn status_for(err: &CardError) -> StatusCode {
    match err {
        CardError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CardError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        CardError::NotFound(_) => StatusCode::NOT_FOUND,
        CardError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        CardError::InvalidInput(message.into()).into()
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CardError::NotFound(message.into()).into()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let error = err.into();
        let status = error
            .downcast_ref::<CardError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { status, error }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match self.error.downcast_ref::<CardError>() {
            Some(card_err) => card_err.message().to_string(),
            None => self.error.to_string(),
        };

        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        } else {
            tracing::debug!("Request rejected ({}): {}", self.status, message);
        }

        (
            self.status,
            Json(ApiResponse::<()> {
                success: false,
                data: None,
                error: Some(message),
            }),
        )
            .into_response()
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(request_id::REQUEST_ID_HEADER),
        ])
        .allow_credentials(true)
}

/// The full application router with middleware.
pub fn build_router(state: AppState) -> Router {
    let upload_dir = state.config.upload_dir.clone();
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(health_routes::health_routes())
        .merge(price_routes::price_routes())
        .merge(sentiment_routes::sentiment_routes())
        .merge(forecast_routes::forecast_routes())
        .merge(portfolio_routes::portfolio_routes())
        .merge(alert_routes::alert_routes())
        .merge(notification_routes::notification_routes())
        .merge(listing_routes::listing_routes())
        .merge(upload_routes::upload_routes())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(middleware::from_fn(security_headers::security_headers_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<axum::body::Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Read configuration from the environment, start background jobs and
/// serve until shutdown. Call [`load_environment`] first to pick up `.env`.
pub async fn run_server() -> Result<()> {
    let config = AppConfig::from_env()?;
    let addr = config.bind_addr();

    tracing::info!("Starting {} v{}", SERVICE_NAME, API_VERSION);
    tracing::info!("  Database: {}", config.database_url);
    tracing::info!("  eBay daily limit: {}", config.tracker.daily_limit);
    tracing::info!("  Upload dir: {}", config.upload_dir.display());

    let state = AppState::from_config(config).await?;
    let jobs = jobs::spawn_background_jobs(state.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for job in jobs {
        job.abort();
    }
    // Let in-flight SQLite writes settle
    tokio::time::sleep(Duration::from_millis(100)).await;
    tracing::info!("Server stopped");
    Ok(())
}
