use anyhow::Result;
use card_core::{format_timestamp, DataSource, PriceSummary};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// eBay's terms cap how long sold-price data may be kept.
pub const DEFAULT_CACHE_DAYS: i64 = 90;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPrices {
    #[serde(flatten)]
    summary: PriceSummary,
    source: DataSource,
}

/// A cache hit
#[derive(Debug, Clone)]
pub struct CachedPrices {
    pub query: String,
    pub summary: PriceSummary,
    pub source: DataSource,
    pub cached_at: String,
}

#[derive(Clone)]
pub struct PriceCache {
    pool: SqlitePool,
}

impl PriceCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Trimmed, lower-cased, single-spaced query.
    pub fn normalize_key(query: &str) -> String {
        query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Newest non-expired entry for `query`.
    pub async fn get(&self, query: &str) -> Result<Option<CachedPrices>> {
        let key = Self::normalize_key(query);
        let row: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT price_data, cached_at FROM price_cache
            WHERE card_query = ? AND expires_at > ?
            ORDER BY cached_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(&key)
        .bind(format_timestamp(Utc::now()))
        .fetch_optional(&self.pool)
        .await?;

        let Some((price_data, cached_at)) = row else {
            tracing::info!("Cache miss for '{}'", key);
            return Ok(None);
        };

        let stored: StoredPrices = serde_json::from_str(&price_data)?;
        tracing::info!("Cache hit for '{}'", key);

        Ok(Some(CachedPrices {
            query: key,
            summary: stored.summary,
            source: stored.source,
            cached_at,
        }))
    }

    /// Store a summary for `days`. Empty summaries are skipped and return `false`.
    pub async fn set(
        &self,
        query: &str,
        summary: &PriceSummary,
        source: DataSource,
        days: i64,
    ) -> Result<bool> {
        if summary.is_empty() {
            return Ok(false);
        }

        let key = Self::normalize_key(query);
        let now = Utc::now();
        let price_data = serde_json::to_string(&StoredPrices {
            summary: summary.clone(),
            source,
        })?;

        sqlx::query(
            "INSERT INTO price_cache (card_query, price_data, cached_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&key)
        .bind(price_data)
        .bind(format_timestamp(now))
        .bind(format_timestamp(now + Duration::days(days)))
        .execute(&self.pool)
        .await?;

        Ok(true)
    }

    /// Delete expired entries, returning how many were removed.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM price_cache WHERE expires_at <= ?")
            .bind(format_timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            tracing::info!("Removed {} expired price cache entries", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use card_core::PriceItem;

    fn summary(prices: &[f64]) -> PriceSummary {
        PriceSummary::from_items(
            prices
                .iter()
                .map(|p| PriceItem {
                    price: *p,
                    date: "2025-10-01".to_string(),
                    title: "card".to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(
            PriceCache::normalize_key("  Victor   Wembanyama\tPRIZM "),
            "victor wembanyama prizm"
        );
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = PriceCache::new(test_pool().await);
        assert!(cache.get("wemby prizm").await.unwrap().is_none());

        let stored = cache
            .set("Wemby Prizm", &summary(&[100.0, 110.0]), DataSource::Ebay, DEFAULT_CACHE_DAYS)
            .await
            .unwrap();
        assert!(stored);

        let hit = cache.get("  wemby   prizm").await.unwrap().unwrap();
        assert_eq!(hit.summary.avg_price, 105.0);
        assert_eq!(hit.source, DataSource::Ebay);
        assert!(hit.cached_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_empty_summary_not_stored() {
        let cache = PriceCache::new(test_pool().await);
        let stored = cache
            .set("nothing", &summary(&[]), DataSource::Mock, DEFAULT_CACHE_DAYS)
            .await
            .unwrap();
        assert!(!stored);
        assert!(cache.get("nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses_and_cleaned() {
        let cache = PriceCache::new(test_pool().await);
        cache
            .set("old card", &summary(&[10.0]), DataSource::Mock, -1)
            .await
            .unwrap();

        assert!(cache.get("old card").await.unwrap().is_none());
        assert_eq!(cache.cleanup_expired().await.unwrap(), 1);
        assert_eq!(cache.cleanup_expired().await.unwrap(), 0);
    }
}
