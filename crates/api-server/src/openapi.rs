//! OpenAPI document served at `/api-docs/openapi.json` and browsable at `/docs`.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    alert_routes, forecast_routes, health_routes, listing_routes, notification_routes,
    portfolio_routes, price_routes, sentiment_routes, upload_routes,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DimeDrop API",
        version = "1.0.0",
        description = "Basketball card prices, sentiment, forecasts, portfolios and price alerts"
    ),
    paths(
        health_routes::root,
        health_routes::health,
        price_routes::get_prices,
        price_routes::get_prices_by_path,
        listing_routes::get_listings,
        sentiment_routes::get_sentiment,
        forecast_routes::get_forecast,
        portfolio_routes::get_portfolio,
        portfolio_routes::add_card,
        portfolio_routes::delete_card,
        portfolio_routes::export_portfolio,
        upload_routes::upload_card,
        alert_routes::get_alerts,
        alert_routes::create_alert,
        alert_routes::update_alert,
        alert_routes::delete_alert,
        alert_routes::check_alerts,
        notification_routes::get_preferences,
        notification_routes::update_preferences,
        notification_routes::delete_preferences,
        notification_routes::send_test_notification,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service status"),
        (name = "Prices", description = "eBay sold prices, listings and forecasts"),
        (name = "Sentiment", description = "Reddit and news sentiment"),
        (name = "Portfolio", description = "Per-user card collections"),
        (name = "Alerts", description = "Price alerts"),
        (name = "Notifications", description = "Email notification preferences"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
