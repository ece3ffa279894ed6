pub mod cache;
pub mod forecast;
pub mod rate_limit;
pub mod tracker;

pub use cache::{CachedPrices, PriceCache};
pub use forecast::{forecast, Forecast, ForecastPoint, Trend};
pub use rate_limit::DailyRateLimiter;
pub use tracker::{PriceQuote, PriceTracker, TrackerConfig};

use anyhow::Result;
use sqlx::SqlitePool;

/// Create the cache and rate-limit tables if they are missing.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    let schema = include_str!("../schema.sql");

    for statement in schema.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt).execute(pool).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    pool
}
