use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::lexicon::PolarityScorer;
use crate::SourceSentiment;

pub const TARGET_SUBREDDITS: [&str; 5] = [
    "sports",
    "basketballcards",
    "tradingcards",
    "sportscollectors",
    "nba",
];

const POSTS_PER_SUBREDDIT: u32 = 10;
const KARMA_LOOKUP_CONCURRENCY: usize = 5;
const MAX_POST_AGE_HOURS: f64 = 168.0;

#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

/// A post pulled from a subreddit search
#[derive(Debug, Clone)]
pub struct RedditPost {
    pub title: String,
    pub selftext: String,
    pub score: i64,
    pub num_comments: u64,
    pub subreddit: String,
    pub author: Option<String>,
    pub author_karma: Option<i64>,
    pub age_hours: f64,
}

/// Weight of a post: author karma and upvotes add up to 3x, then decays
/// linearly over a week down to a 0.1 floor.
pub fn post_weight(author_karma: Option<i64>, score: i64, age_hours: f64) -> f64 {
    let mut weight = 1.0;
    if let Some(karma) = author_karma.filter(|k| *k != 0) {
        weight += (karma as f64 / 1000.0).min(2.0);
    }
    weight += (score as f64 / 50.0).min(1.0);
    let age_factor = (1.0 - age_hours / MAX_POST_AGE_HOURS).max(0.1);
    weight * age_factor
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    #[serde(default = "Vec::new")]
    children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
struct Thing<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct PostData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: u64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    subreddit: String,
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AboutResponse {
    data: AboutData,
}

#[derive(Debug, Deserialize)]
struct AboutData {
    #[serde(default)]
    link_karma: i64,
    #[serde(default)]
    comment_karma: i64,
}

/// Application-only Reddit client.
#[derive(Clone)]
pub struct RedditClient {
    credentials: RedditCredentials,
    client: Client,
    auth_url: String,
    api_base: String,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> Self {
        Self::with_base_urls(
            credentials,
            "https://www.reddit.com/api/v1/access_token",
            "https://oauth.reddit.com",
        )
    }

    pub fn with_base_urls(
        credentials: RedditCredentials,
        auth_url: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(credentials.user_agent.clone())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            credentials,
            client,
            auth_url: auth_url.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Search every target subreddit and score the posts. Any failure
    /// outside a single subreddit search yields an empty result.
    pub async fn fetch_sentiment(&self, card_name: &str, scorer: &PolarityScorer) -> SourceSentiment {
        match self.collect_posts(card_name).await {
            Ok(posts) => score_posts(&posts, scorer),
            Err(e) => {
                tracing::error!("Error fetching Reddit sentiment: {}", e);
                SourceSentiment::empty("reddit")
            }
        }
    }

    async fn collect_posts(&self, card_name: &str) -> Result<Vec<RedditPost>, reqwest::Error> {
        let token = self.access_token().await?;
        let now = Utc::now().timestamp() as f64;
        let mut posts = Vec::new();

        for subreddit in TARGET_SUBREDDITS {
            match self.search_subreddit(&token, subreddit, card_name).await {
                Ok(found) => {
                    posts.extend(found.into_iter().map(|p| RedditPost {
                        title: p.title,
                        selftext: p.selftext,
                        score: p.score,
                        num_comments: p.num_comments,
                        subreddit: p.subreddit,
                        author: p.author.filter(|a| a != "[deleted]"),
                        author_karma: None,
                        age_hours: ((now - p.created_utc) / 3600.0).max(0.0),
                    }));
                }
                Err(e) => {
                    tracing::warn!("Error fetching posts from /r/{}: {}", subreddit, e);
                }
            }
        }

        let karma = self.author_karma(&token, &posts).await;
        for post in &mut posts {
            post.author_karma = post.author.as_ref().and_then(|a| karma.get(a).copied());
        }

        tracing::info!("Collected {} Reddit posts for '{}'", posts.len(), card_name);
        Ok(posts)
    }

    async fn access_token(&self) -> Result<String, reqwest::Error> {
        let response: TokenResponse = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.access_token)
    }

    async fn search_subreddit(
        &self,
        token: &str,
        subreddit: &str,
        card_name: &str,
    ) -> Result<Vec<PostData>, reqwest::Error> {
        let url = format!("{}/r/{}/search", self.api_base, subreddit);
        let limit = POSTS_PER_SUBREDDIT.to_string();
        let listing: Listing<PostData> = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("q", card_name),
                ("sort", "new"),
                ("restrict_sr", "1"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(listing.data.children.into_iter().map(|t| t.data).collect())
    }

    /// Best-effort karma lookups, a few at a time.
    async fn author_karma(&self, token: &str, posts: &[RedditPost]) -> HashMap<String, i64> {
        let mut authors: Vec<&str> = posts.iter().filter_map(|p| p.author.as_deref()).collect();
        authors.sort_unstable();
        authors.dedup();

        stream::iter(authors.into_iter().map(String::from).collect::<Vec<String>>())
            .map(|author| async move {
                let url = format!("{}/user/{}/about", self.api_base, author);
                let result: Result<AboutResponse, reqwest::Error> = async {
                    self.client
                        .get(&url)
                        .bearer_auth(token)
                        .send()
                        .await?
                        .error_for_status()?
                        .json::<AboutResponse>()
                        .await
                }
                .await;

                match result {
                    Ok(about) => Some((author.to_string(), about.data.link_karma + about.data.comment_karma)),
                    Err(e) => {
                        tracing::debug!("Karma lookup failed for {}: {}", author, e);
                        None
                    }
                }
            })
            .buffer_unordered(KARMA_LOOKUP_CONCURRENCY)
            .filter_map(|entry| async move { entry })
            .collect()
            .await
    }
}

/// Weighted mean polarity over posts with any text.
pub fn score_posts(posts: &[RedditPost], scorer: &PolarityScorer) -> SourceSentiment {
    let mut scores = Vec::new();
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for post in posts {
        let text = format!("{} {}", post.title, post.selftext);
        if text.trim().is_empty() {
            continue;
        }
        let score = scorer.polarity(&text);
        let weight = post_weight(post.author_karma, post.score, post.age_hours);
        weighted += score * weight;
        total_weight += weight;
        scores.push(score);
    }

    SourceSentiment {
        total: posts.len(),
        avg_sentiment: if total_weight > 0.0 { weighted / total_weight } else { 0.0 },
        scores,
        source: "reddit".to_string(),
    }
}

/// Canned Reddit result used when no credentials are configured.
pub fn mock_sentiment() -> SourceSentiment {
    SourceSentiment {
        total: 3,
        avg_sentiment: 0.65,
        scores: vec![0.7, 0.6, 0.65],
        source: "reddit_mock".to_string(),
    }
}
