use card_core::CardError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod lexicon;
pub mod news;
pub mod reddit;

pub use lexicon::PolarityScorer;
pub use news::NewsClient;
pub use reddit::{RedditClient, RedditCredentials};

pub const REDDIT_WEIGHT: f64 = 0.7;
pub const NEWS_WEIGHT: f64 = 0.3;

const DEFAULT_USER_AGENT: &str = "DimeDrop/1.0 by DimeDropBot";

/// Hours a report stays in the in-memory cache.
pub const CACHE_TTL_HOURS: i64 = 6;

/// Per-source result: item count and mean polarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSentiment {
    pub total: usize,
    pub avg_sentiment: f64,
    pub scores: Vec<f64>,
    pub source: String,
}

impl SourceSentiment {
    pub fn empty(source: &str) -> Self {
        Self {
            total: 0,
            avg_sentiment: 0.0,
            scores: Vec::new(),
            source: source.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompositeSentiment {
    pub overall_sentiment: f64,
    pub reddit_sentiment: f64,
    pub news_sentiment: f64,
    pub reddit_weight: f64,
    pub news_weight: f64,
    pub total_sources: u8,
    pub reddit_confidence: f64,
    pub news_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SentimentReport {
    pub card_name: String,
    pub timestamp: DateTime<Utc>,
    /// 0-100
    pub flip_score: u8,
    pub sentiment_breakdown: CompositeSentiment,
    pub total_discussions: usize,
    pub last_updated: DateTime<Utc>,
    pub confidence_level: ConfidenceLevel,
    /// `reddit` or `reddit_mock`
    pub reddit_source: String,
}

#[derive(Debug, Clone, Default)]
pub struct SentimentConfig {
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_user_agent: String,
    pub news_api_key: Option<String>,
}

impl SentimentConfig {
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            reddit_client_id: var("REDDIT_CLIENT_ID"),
            reddit_client_secret: var("REDDIT_CLIENT_SECRET"),
            reddit_user_agent: var("REDDIT_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            news_api_key: var("NEWS_API_KEY").or_else(|| var("NEWSAPI_KEY")),
        }
    }

    pub fn reddit_available(&self) -> bool {
        matches!(
            (&self.reddit_client_id, &self.reddit_client_secret),
            (Some(id), Some(secret)) if looks_real(id) && looks_real(secret)
        )
    }

    pub fn news_available(&self) -> bool {
        self.news_api_key.as_deref().is_some_and(looks_real)
    }
}

/// Placeholder values and short strings are not treated as credentials.
pub fn looks_real(value: &str) -> bool {
    !value.starts_with("placeholder") && value.len() > 10
}

pub fn composite_sentiment(reddit: &SourceSentiment, news: &SourceSentiment) -> CompositeSentiment {
    CompositeSentiment {
        overall_sentiment: reddit.avg_sentiment * REDDIT_WEIGHT + news.avg_sentiment * NEWS_WEIGHT,
        reddit_sentiment: reddit.avg_sentiment,
        news_sentiment: news.avg_sentiment,
        reddit_weight: REDDIT_WEIGHT,
        news_weight: NEWS_WEIGHT,
        total_sources: (reddit.total > 0) as u8 + (news.total > 0) as u8,
        reddit_confidence: (reddit.total as f64 / 10.0).min(1.0),
        news_confidence: (news.total as f64 / 5.0).min(1.0),
    }
}

/// Sentiment mapped onto 0-100, scaled by the mean source confidence.
pub fn flip_score(composite: &CompositeSentiment) -> u8 {
    let base = (composite.overall_sentiment + 1.0) * 50.0;
    let confidence = (composite.reddit_confidence + composite.news_confidence) / 2.0;
    (base * confidence).trunc().clamp(0.0, 100.0) as u8
}

pub fn confidence_level(composite: &CompositeSentiment) -> ConfidenceLevel {
    let mean_confidence = (composite.reddit_confidence + composite.news_confidence) / 2.0;
    match composite.total_sources {
        2 if mean_confidence >= 0.75 => ConfidenceLevel::High,
        0 => ConfidenceLevel::Low,
        _ => ConfidenceLevel::Medium,
    }
}

struct CachedReport {
    stored_at: DateTime<Utc>,
    report: SentimentReport,
}

/// Reddit + NewsAPI sentiment with a Flip Score, cached per card for six hours.
pub struct SentimentAnalyzer {
    reddit: Option<RedditClient>,
    news: Option<NewsClient>,
    scorer: PolarityScorer,
    cache: DashMap<String, CachedReport>,
}

impl SentimentAnalyzer {
    pub fn new(config: &SentimentConfig) -> Self {
        let reddit = if config.reddit_available() {
            Some(RedditClient::new(RedditCredentials {
                client_id: config.reddit_client_id.clone().unwrap_or_default(),
                client_secret: config.reddit_client_secret.clone().unwrap_or_default(),
                user_agent: config.reddit_user_agent.clone(),
            }))
        } else {
            tracing::warn!("Reddit API not configured with real credentials - using mock data");
            None
        };

        let news = match config.news_api_key.as_deref() {
            Some(key) if config.news_available() => Some(NewsClient::new(key)),
            _ => {
                tracing::warn!("NewsAPI key not configured, news sentiment disabled");
                None
            }
        };

        Self::with_clients(reddit, news)
    }

    pub fn with_clients(reddit: Option<RedditClient>, news: Option<NewsClient>) -> Self {
        Self {
            reddit,
            news,
            scorer: PolarityScorer::new(),
            cache: DashMap::new(),
        }
    }

    pub fn reddit_configured(&self) -> bool {
        self.reddit.is_some()
    }

    pub fn news_configured(&self) -> bool {
        self.news.is_some()
    }

    /// Full sentiment report for a card, served from cache when fresh.
    pub async fn analyze(&self, card_name: &str) -> Result<SentimentReport, CardError> {
        let card_name = card_name.trim();
        if card_name.is_empty() {
            return Err(CardError::InvalidInput("Card name is required".to_string()));
        }

        let key = card_name.to_lowercase();
        let now = Utc::now();
        if let Some(entry) = self.cache.get(&key) {
            if is_fresh(entry.stored_at, now) {
                tracing::debug!("Sentiment cache hit for '{}'", card_name);
                return Ok(entry.report.clone());
            }
        }
        // Guard from `get` is dropped above; removing while holding it would deadlock
        self.cache.remove_if(&key, |_, entry| !is_fresh(entry.stored_at, now));

        let reddit = match &self.reddit {
            Some(client) => client.fetch_sentiment(card_name, &self.scorer).await,
            None => {
                tracing::info!("Using mock Reddit data for '{}' (API not configured)", card_name);
                reddit::mock_sentiment()
            }
        };

        let news = match &self.news {
            Some(client) => client.fetch_sentiment(card_name, &self.scorer).await,
            None => SourceSentiment::empty("news"),
        };

        let composite = composite_sentiment(&reddit, &news);
        let now = Utc::now();
        let report = SentimentReport {
            card_name: card_name.to_string(),
            timestamp: now,
            flip_score: flip_score(&composite),
            total_discussions: reddit.total + news.total,
            last_updated: now,
            confidence_level: confidence_level(&composite),
            sentiment_breakdown: composite,
            reddit_source: reddit.source,
        };

        tracing::info!(
            "Sentiment analysis complete for '{}', Flip Score: {}",
            card_name,
            report.flip_score
        );

        self.cache.insert(
            key,
            CachedReport {
                stored_at: now,
                report: report.clone(),
            },
        );
        Ok(report)
    }

    /// Drop reports older than the cache TTL. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.cache.len();
        self.cache.retain(|_, entry| is_fresh(entry.stored_at, now));
        before.saturating_sub(self.cache.len())
    }
}

fn is_fresh(stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - stored_at < chrono::Duration::hours(CACHE_TTL_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(total: usize, avg: f64) -> SourceSentiment {
        SourceSentiment {
            total,
            avg_sentiment: avg,
            scores: Vec::new(),
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_looks_real() {
        assert!(!looks_real("placeholder_reddit_id"));
        assert!(!looks_real("short"));
        assert!(looks_real("abcdefghijklmnop"));
    }

    #[test]
    fn test_config_availability() {
        let config = SentimentConfig {
            reddit_client_id: Some("abcdefghijk1".to_string()),
            reddit_client_secret: Some("placeholder-secret".to_string()),
            reddit_user_agent: DEFAULT_USER_AGENT.to_string(),
            news_api_key: Some("0123456789abcdef".to_string()),
        };
        assert!(!config.reddit_available());
        assert!(config.news_available());
    }

    #[test]
    fn test_composite_and_flip_score() {
        let composite = composite_sentiment(&source(3, 0.65), &source(0, 0.0));
        assert!((composite.overall_sentiment - 0.455).abs() < 1e-9);
        assert_eq!(composite.total_sources, 1);
        assert!((composite.reddit_confidence - 0.3).abs() < 1e-9);
        assert_eq!(composite.news_confidence, 0.0);
        // (1.455 * 50) * 0.15 = 10.91
        assert_eq!(flip_score(&composite), 10);
        assert_eq!(confidence_level(&composite), ConfidenceLevel::Medium);
    }

    #[test]
    fn test_flip_score_bounds() {
        let max = composite_sentiment(&source(20, 1.0), &source(10, 1.0));
        assert_eq!(flip_score(&max), 100);
        assert_eq!(confidence_level(&max), ConfidenceLevel::High);

        let min = composite_sentiment(&source(20, -1.0), &source(10, -1.0));
        assert_eq!(flip_score(&min), 0);

        let none = composite_sentiment(&source(0, 0.0), &source(0, 0.0));
        assert_eq!(flip_score(&none), 0);
        assert_eq!(confidence_level(&none), ConfidenceLevel::Low);
    }

    #[tokio::test]
    async fn test_analyze_without_credentials_uses_mock() {
        let analyzer = SentimentAnalyzer::new(&SentimentConfig::default());
        let report = analyzer.analyze("Wembanyama Prizm").await.unwrap();

        assert_eq!(report.flip_score, 10);
        assert_eq!(report.total_discussions, 3);
        assert_eq!(report.reddit_source, "reddit_mock");

        let again = analyzer.analyze("  wembanyama prizm ").await.unwrap();
        assert_eq!(again.timestamp, report.timestamp);
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_name() {
        let analyzer = SentimentAnalyzer::with_clients(None, None);
        assert!(matches!(
            analyzer.analyze("   ").await,
            Err(CardError::InvalidInput(_))
        ));
    }

    fn age_entry(analyzer: &SentimentAnalyzer, key: &str, hours: i64) {
        let mut entry = analyzer.cache.get_mut(key).unwrap();
        entry.stored_at = entry.stored_at - chrono::Duration::hours(hours);
    }

    #[tokio::test]
    async fn test_cleanup_expired_removes_stale_reports() {
        let analyzer = SentimentAnalyzer::with_clients(None, None);
        analyzer.analyze("Luka Doncic").await.unwrap();
        analyzer.analyze("Wembanyama Prizm").await.unwrap();
        age_entry(&analyzer, "luka doncic", CACHE_TTL_HOURS + 1);

        assert_eq!(analyzer.cleanup_expired(), 1);
        assert!(analyzer.cache.get("luka doncic").is_none());
        assert!(analyzer.cache.get("wembanyama prizm").is_some());
        assert_eq!(analyzer.cleanup_expired(), 0);
    }

    #[tokio::test]
    async fn test_expired_report_is_replaced_on_read() {
        let analyzer = SentimentAnalyzer::with_clients(None, None);
        let first = analyzer.analyze("Luka Doncic").await.unwrap();
        age_entry(&analyzer, "luka doncic", CACHE_TTL_HOURS + 1);

        let second = analyzer.analyze("Luka Doncic").await.unwrap();
        assert!(second.timestamp >= first.timestamp);
        let stored_at = analyzer.cache.get("luka doncic").unwrap().stored_at;
        assert!(Utc::now() - stored_at < chrono::Duration::hours(1));
        assert_eq!(analyzer.cache.len(), 1);
    }
}
