use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::lexicon::PolarityScorer;
use crate::SourceSentiment;

const PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
}

/// NewsAPI `everything` search.
#[derive(Clone)]
pub struct NewsClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl NewsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://newsapi.org/v2")
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key: api_key.into(),
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Mean polarity over recent articles. Errors and non-200 replies give an
    /// empty result.
    pub async fn fetch_sentiment(&self, card_name: &str, scorer: &PolarityScorer) -> SourceSentiment {
        let query = format!("basketball card {}", card_name);
        let url = format!("{}/everything", self.base_url);
        let page_size = PAGE_SIZE.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("apiKey", self.api_key.as_str()),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Error fetching news sentiment: {}", e);
                return SourceSentiment::empty("news");
            }
        };

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("NewsAPI error: {} - {}", status, body);
            return SourceSentiment::empty("news");
        }

        match response.json::<EverythingResponse>().await {
            Ok(parsed) => score_articles(&parsed.articles, scorer),
            Err(e) => {
                tracing::error!("Invalid NewsAPI response: {}", e);
                SourceSentiment::empty("news")
            }
        }
    }
}

fn score_articles(articles: &[Article], scorer: &PolarityScorer) -> SourceSentiment {
    let scores: Vec<f64> = articles
        .iter()
        .map(|a| {
            format!(
                "{} {} {}",
                a.title.as_deref().unwrap_or(""),
                a.description.as_deref().unwrap_or(""),
                a.content.as_deref().unwrap_or("")
            )
        })
        .filter(|text| !text.trim().is_empty())
        .map(|text| scorer.polarity(&text))
        .collect();

    let avg = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    SourceSentiment {
        total: articles.len(),
        avg_sentiment: avg,
        scores,
        source: "news".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str) -> Article {
        Article {
            title: Some(title.to_string()),
            description: None,
            content: None,
        }
    }

    #[test]
    fn test_score_articles_mean() {
        let scorer = PolarityScorer::new();
        let articles = vec![
            article("Rookie card prices surge"),
            article("Market crash hits collectors"),
            article("Card show this weekend"),
            Article {
                title: None,
                description: None,
                content: None,
            },
        ];
        let result = score_articles(&articles, &scorer);
        assert_eq!(result.total, 4);
        assert_eq!(result.scores, vec![1.0, -1.0, 0.0]);
        assert_eq!(result.avg_sentiment, 0.0);
    }
}
