use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

/// Buffer below eBay's 5,000 calls/day allowance.
pub const DEFAULT_DAILY_LIMIT: u32 = 4800;

/// Per-API call counter that resets each UTC day.
#[derive(Clone)]
pub struct DailyRateLimiter {
    pool: SqlitePool,
    api_name: String,
    daily_limit: u32,
}

impl DailyRateLimiter {
    pub fn new(pool: SqlitePool, api_name: impl Into<String>, daily_limit: u32) -> Self {
        Self {
            pool,
            api_name: api_name.into(),
            daily_limit,
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Calls recorded today.
    pub async fn call_count(&self) -> Result<u32> {
        let count: Option<(i64,)> = sqlx::query_as(
            "SELECT call_count FROM api_rate_limits WHERE api_name = ? AND date = ?",
        )
        .bind(&self.api_name)
        .bind(Self::today())
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.map(|(c,)| c.max(0) as u32).unwrap_or(0))
    }

    /// Returns `true` and records the call when under today's limit.
    /// Storage errors allow the call.
    pub async fn check_and_increment(&self) -> bool {
        match self.try_increment().await {
            Ok(Some(count)) => {
                tracing::debug!("{} API call count: {}/{}", self.api_name, count, self.daily_limit);
                true
            }
            Ok(None) => {
                tracing::error!(
                    "{} API rate limit exceeded: {}/{}",
                    self.api_name,
                    self.daily_limit,
                    self.daily_limit
                );
                false
            }
            Err(e) => {
                tracing::error!("Error checking rate limit: {}", e);
                true
            }
        }
    }

    /// Atomic conditional upsert; `None` when the limit is already reached.
    async fn try_increment(&self) -> Result<Option<u32>> {
        if self.daily_limit == 0 {
            return Ok(None);
        }

        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO api_rate_limits (api_name, date, call_count)
            VALUES (?, ?, 1)
            ON CONFLICT(api_name, date) DO UPDATE SET call_count = call_count + 1
            WHERE call_count < ?
            RETURNING call_count
            "#,
        )
        .bind(&self.api_name)
        .bind(Self::today())
        .bind(self.daily_limit as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(c,)| c as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;

    #[tokio::test]
    async fn test_counts_until_limit() {
        let limiter = DailyRateLimiter::new(test_pool().await, "ebay", 3);
        assert_eq!(limiter.call_count().await.unwrap(), 0);

        assert!(limiter.check_and_increment().await);
        assert!(limiter.check_and_increment().await);
        assert!(limiter.check_and_increment().await);
        assert!(!limiter.check_and_increment().await);

        assert_eq!(limiter.call_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_counters_are_per_api() {
        let pool = test_pool().await;
        let ebay = DailyRateLimiter::new(pool.clone(), "ebay", 1);
        let news = DailyRateLimiter::new(pool, "news", 1);

        assert!(ebay.check_and_increment().await);
        assert!(!ebay.check_and_increment().await);
        assert!(news.check_and_increment().await);
    }

    #[tokio::test]
    async fn test_storage_error_fails_open() {
        let pool = test_pool().await;
        sqlx::query("DROP TABLE api_rate_limits")
            .execute(&pool)
            .await
            .unwrap();

        let limiter = DailyRateLimiter::new(pool, "ebay", 1);
        assert!(limiter.check_and_increment().await);
    }
}
