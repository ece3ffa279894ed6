use async_trait::async_trait;
use card_core::{now_timestamp, CardError, DataSource, Listing, PriceSource, PriceSummary};
use ebay_client::EbayClient;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::cache::{PriceCache, DEFAULT_CACHE_DAYS};
use crate::forecast::{forecast, Forecast};
use crate::rate_limit::{DailyRateLimiter, DEFAULT_DAILY_LIMIT};

const MIN_QUERY_LEN: usize = 3;
const SOLD_ITEMS_LIMIT: usize = 50;
pub const MAX_LISTINGS: usize = 100;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub daily_limit: u32,
    pub cache_days: i64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            cache_days: DEFAULT_CACHE_DAYS,
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            daily_limit: std::env::var("EBAY_DAILY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.daily_limit),
            cache_days: std::env::var("PRICE_CACHE_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|d: &i64| *d > 0)
                .unwrap_or(defaults.cache_days),
        }
    }
}

/// `GET /prices` payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PriceQuote {
    pub card: String,
    #[serde(flatten)]
    pub summary: PriceSummary,
    pub cached: bool,
    pub cache_date: Option<String>,
    pub source: DataSource,
}

/// eBay prices behind a 90-day cache and a daily call budget.
#[derive(Clone)]
pub struct PriceTracker {
    ebay: EbayClient,
    cache: PriceCache,
    limiter: DailyRateLimiter,
    config: TrackerConfig,
}

impl PriceTracker {
    pub fn new(pool: SqlitePool, ebay: EbayClient, config: TrackerConfig) -> Self {
        Self {
            ebay,
            cache: PriceCache::new(pool.clone()),
            limiter: DailyRateLimiter::new(pool, "ebay", config.daily_limit),
            config,
        }
    }

    pub fn ebay(&self) -> &EbayClient {
        &self.ebay
    }

    pub fn rate_limiter(&self) -> &DailyRateLimiter {
        &self.limiter
    }

    pub async fn get_prices(&self, card: &str) -> Result<PriceQuote, CardError> {
        let query = card.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Err(CardError::InvalidInput(
                "Card query must be at least 3 characters".to_string(),
            ));
        }

        match self.cache.get(query).await {
            Ok(Some(hit)) => {
                return Ok(PriceQuote {
                    card: query.to_string(),
                    summary: hit.summary,
                    cached: true,
                    cache_date: Some(hit.cached_at),
                    source: hit.source,
                });
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Cache lookup failed, continuing without cache: {}", e),
        }

        self.check_budget().await?;

        let (summary, source) = self.ebay.search_sold_prices(query, SOLD_ITEMS_LIMIT).await;

        if let Err(e) = self
            .cache
            .set(query, &summary, source, self.config.cache_days)
            .await
        {
            tracing::error!("Error writing to cache: {}", e);
        }

        Ok(PriceQuote {
            card: query.to_string(),
            summary,
            cached: false,
            cache_date: Some(now_timestamp()),
            source,
        })
    }

    /// Active auctions. Counts against the same daily eBay budget.
    pub async fn get_listings(&self, card_name: &str, limit: usize) -> Result<Vec<Listing>, CardError> {
        let card_name = card_name.trim();
        if card_name.is_empty() {
            return Err(CardError::InvalidInput("card_name is required".to_string()));
        }
        if limit > MAX_LISTINGS {
            return Err(CardError::InvalidInput("Limit cannot exceed 100".to_string()));
        }

        self.check_budget().await?;
        tracing::info!("Received listings request for {}", card_name);
        Ok(self.ebay.search_listings(card_name, limit).await)
    }

    pub async fn forecast(&self, card_name: &str, days: u32) -> Result<Forecast, CardError> {
        let quote = self.get_prices(card_name).await?;
        forecast(&quote.card, &quote.summary, days)
    }

    pub async fn cleanup_cache(&self) -> anyhow::Result<u64> {
        self.cache.cleanup_expired().await
    }

    async fn check_budget(&self) -> Result<(), CardError> {
        if self.limiter.check_and_increment().await {
            Ok(())
        } else {
            Err(CardError::RateLimited(format!(
                "eBay API rate limit exceeded (max {}/day)",
                self.limiter.daily_limit()
            )))
        }
    }
}

#[async_trait]
impl PriceSource for PriceTracker {
    async fn current_price(&self, card_name: &str) -> Result<f64, CardError> {
        Ok(self.get_prices(card_name).await?.summary.avg_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use ebay_client::{EbayConfig, EbayEnvironment};

    fn mock_ebay() -> EbayClient {
        EbayClient::new(EbayConfig {
            app_id: None,
            cert_id: None,
            environment: EbayEnvironment::Production,
        })
    }

    async fn tracker(daily_limit: u32) -> PriceTracker {
        PriceTracker::new(
            test_pool().await,
            mock_ebay(),
            TrackerConfig {
                daily_limit,
                cache_days: 90,
            },
        )
    }

    #[tokio::test]
    async fn test_short_query_rejected() {
        let tracker = tracker(10).await;
        assert!(matches!(
            tracker.get_prices("  ab ").await,
            Err(CardError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let tracker = tracker(10).await;

        let first = tracker.get_prices("Wembanyama Prizm").await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.source, DataSource::Mock);
        assert_eq!(first.summary.avg_price, 152.5);

        let second = tracker.get_prices("wembanyama  prizm").await.unwrap();
        assert!(second.cached);
        assert_eq!(second.summary.count, 5);
        assert!(second.cache_date.is_some());

        assert_eq!(tracker.rate_limiter().call_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_exceeded() {
        let tracker = tracker(1).await;
        tracker.get_prices("LeBron James").await.unwrap();

        let err = tracker.get_prices("Stephen Curry").await.unwrap_err();
        match err {
            CardError::RateLimited(msg) => assert!(msg.contains("max 1/day")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_listings_limit_validation() {
        let tracker = tracker(10).await;
        assert!(matches!(
            tracker.get_listings("Wemby", 101).await,
            Err(CardError::InvalidInput(_))
        ));
        assert_eq!(tracker.get_listings("Wemby", 20).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_price_source_returns_average() {
        let tracker = tracker(10).await;
        let price = tracker.current_price("Ja Morant Optic").await.unwrap();
        assert_eq!(price, 48.9);
    }

    #[tokio::test]
    async fn test_forecast_uses_price_history() {
        let tracker = tracker(10).await;
        let forecast = tracker.forecast("Wemby Prizm", 5).await.unwrap();
        assert_eq!(forecast.predictions.len(), 5);
        assert_eq!(forecast.data_points, 5);
    }
}
