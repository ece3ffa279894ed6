use httpmock::prelude::*;
use sentiment_analysis::{
    ConfidenceLevel, NewsClient, PolarityScorer, RedditClient, RedditCredentials,
    SentimentAnalyzer,
};
use serde_json::json;

fn credentials() -> RedditCredentials {
    RedditCredentials {
        client_id: "client-id-1234".to_string(),
        client_secret: "client-secret-1234".to_string(),
        user_agent: "DimeDrop-test/1.0".to_string(),
    }
}

#[tokio::test]
async fn test_news_sentiment_from_newsapi() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/everything")
                .query_param("q", "basketball card Wemby")
                .query_param("pageSize", "20")
                .query_param("apiKey", "news-key-123456");
            then.status(200).json_body(json!({
                "status": "ok",
                "articles": [
                    {"title": "Wemby rookie card prices surge", "description": null, "content": null},
                    {"title": "Collectors love the new Prizm set", "description": "great demand", "content": ""}
                ]
            }));
        })
        .await;

    let client = NewsClient::with_base_url("news-key-123456", server.base_url());
    let result = client.fetch_sentiment("Wemby", &PolarityScorer::new()).await;

    mock.assert_async().await;
    assert_eq!(result.total, 2);
    assert_eq!(result.avg_sentiment, 1.0);
}

#[tokio::test]
async fn test_news_error_gives_empty_result() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/everything");
            then.status(426).json_body(json!({"status": "error"}));
        })
        .await;

    let client = NewsClient::with_base_url("news-key-123456", server.base_url());
    let result = client.fetch_sentiment("Wemby", &PolarityScorer::new()).await;
    assert_eq!(result.total, 0);
    assert_eq!(result.avg_sentiment, 0.0);
}

#[tokio::test]
async fn test_reddit_skips_failing_subreddits() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/access_token");
            then.status(200)
                .json_body(json!({"access_token": "reddit-token", "token_type": "bearer"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/r/basketballcards/search")
                .query_param("sort", "new")
                .query_param("restrict_sr", "1");
            then.status(200).json_body(json!({
                "data": {"children": [
                    {"data": {"title": "Amazing Wemby pickup", "selftext": "", "score": 50,
                              "num_comments": 3, "created_utc": 0.0,
                              "subreddit": "basketballcards", "author": "collector1"}}
                ]}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/user/collector1/about");
            then.status(200)
                .json_body(json!({"data": {"link_karma": 500, "comment_karma": 700}}));
        })
        .await;
    for subreddit in ["sports", "tradingcards", "sportscollectors", "nba"] {
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/r/{}/search", subreddit));
                then.status(503);
            })
            .await;
    }

    let client = RedditClient::with_base_urls(
        credentials(),
        server.url("/api/v1/access_token"),
        server.base_url(),
    );
    let result = client.fetch_sentiment("Wemby", &PolarityScorer::new()).await;

    assert_eq!(result.total, 1);
    assert_eq!(result.source, "reddit");
    assert_eq!(result.avg_sentiment, 1.0);
}

#[tokio::test]
async fn test_reddit_auth_failure_gives_empty_result() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/access_token");
            then.status(401);
        })
        .await;

    let client = RedditClient::with_base_urls(
        credentials(),
        server.url("/api/v1/access_token"),
        server.base_url(),
    );
    let analyzer = SentimentAnalyzer::with_clients(Some(client), None);
    let report = analyzer.analyze("Wemby").await.unwrap();

    assert_eq!(report.total_discussions, 0);
    assert_eq!(report.flip_score, 0);
    assert_eq!(report.confidence_level, ConfidenceLevel::Low);
}
