use card_core::DataSource;
use ebay_client::{EbayClient, EbayConfig, EbayEnvironment, EbayError, EbayOAuth};
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

fn configured() -> EbayConfig {
    EbayConfig {
        app_id: Some("test-app-id".to_string()),
        cert_id: Some("test-cert-id".to_string()),
        environment: EbayEnvironment::Sandbox,
    }
}

fn client_for(server: &MockServer) -> EbayClient {
    EbayClient::with_base_urls(configured(), server.base_url(), server.url("/identity/v1/oauth2/token"))
        .with_oauth_backoff(Duration::from_millis(1))
}

#[tokio::test]
async fn test_token_is_cached_between_calls() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/identity/v1/oauth2/token")
                .body_contains("grant_type=client_credentials");
            then.status(200)
                .json_body(json!({"access_token": "abc", "expires_in": 7200}));
        })
        .await;

    let oauth = EbayOAuth::new("app", "cert", server.url("/identity/v1/oauth2/token")).unwrap();
    assert_eq!(oauth.get_access_token(false).await.unwrap(), "abc");
    assert_eq!(oauth.get_access_token(false).await.unwrap(), "abc");
    token_mock.assert_hits_async(1).await;

    oauth.get_access_token(true).await.unwrap();
    token_mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_token_401_fails_without_retry() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/token");
            then.status(401).body("invalid_client");
        })
        .await;

    let oauth = EbayOAuth::new("app", "cert", server.url("/token"))
        .unwrap()
        .with_backoff_base(Duration::from_millis(1));
    let result = oauth.get_access_token(false).await;

    assert!(matches!(result, Err(EbayError::InvalidCredentials(_))));
    token_mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_token_server_errors_are_retried_three_times() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/token");
            then.status(503);
        })
        .await;

    let oauth = EbayOAuth::new("app", "cert", server.url("/token"))
        .unwrap()
        .with_backoff_base(Duration::from_millis(1));

    assert!(oauth.get_access_token(false).await.is_err());
    token_mock.assert_hits_async(3).await;
}

#[tokio::test]
async fn test_search_sold_prices_from_browse_api() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/identity/v1/oauth2/token");
            then.status(200).json_body(json!({"access_token": "tok"}));
        })
        .await;
    let search_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/buy/browse/v1/item_summary/search")
                .header("authorization", "Bearer tok")
                .header("x-ebay-c-marketplace-id", "EBAY_US");
            then.status(200).json_body(json!({
                "total": 3,
                "itemSummaries": [
                    {"itemId": "1", "title": "A", "price": {"value": "100.00", "currency": "USD"},
                     "itemCreationDate": "2025-10-02T10:00:00.000Z"},
                    {"itemId": "2", "title": "B", "price": {"value": "110.00", "currency": "USD"}},
                    {"itemId": "3", "title": "C", "price": {"value": "not-a-number"}}
                ]
            }));
        })
        .await;

    let client = client_for(&server);
    let (summary, source) = client.search_sold_prices("Ja Morant Optic", 50).await;

    search_mock.assert_hits_async(1).await;
    assert_eq!(source, DataSource::Ebay);
    assert_eq!(summary.count, 2);
    assert_eq!(summary.avg_price, 105.0);
    assert_eq!(summary.items[0].date, "2025-10-02");
}

#[tokio::test]
async fn test_search_failure_falls_back_to_mock() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/identity/v1/oauth2/token");
            then.status(200).json_body(json!({"access_token": "tok"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/buy/browse/v1/item_summary/search");
            then.status(500).body("boom");
        })
        .await;

    let client = client_for(&server);
    let (summary, source) = client.search_sold_prices("Wembanyama", 50).await;
    assert_eq!(source, DataSource::Mock);
    assert_eq!(summary.avg_price, 152.5);

    let listings = client.search_listings("Wembanyama", 20).await;
    assert_eq!(listings.len(), 2);
}

#[tokio::test]
async fn test_search_listings_maps_auction_fields() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/identity/v1/oauth2/token");
            then.status(200).json_body(json!({"access_token": "tok"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/buy/browse/v1/item_summary/search")
                .query_param("sort", "endingSoonest")
                .query_param("category_ids", "183454");
            then.status(200).json_body(json!({
                "itemSummaries": [{
                    "itemId": "v1|42|0",
                    "title": "Wemby Silver Prizm",
                    "currentBidPrice": {"value": "250.00", "currency": "USD"},
                    "bidCount": 7,
                    "buyingOptions": ["AUCTION"],
                    "itemEndDate": "2025-10-21T18:00:00.000Z",
                    "image": {"imageUrl": "https://i.ebayimg.com/x.jpg"},
                    "itemWebUrl": "https://www.ebay.com/itm/42",
                    "condition": "Used",
                    "seller": {"feedbackScore": 1500},
                    "itemLocation": {"country": "US"}
                }]
            }));
        })
        .await;

    let listings = client_for(&server).search_listings("Wemby", 20).await;
    assert_eq!(listings.len(), 1);
    let listing = &listings[0];
    assert_eq!(listing.item_id, "v1|42|0");
    assert_eq!(listing.current_price, 250.0);
    assert_eq!(listing.bid_count, 7);
    assert!(!listing.buy_it_now);
    assert_eq!(listing.seller_feedback_score, 1500);
    assert_eq!(listing.location, "US");
}

#[tokio::test]
async fn test_estimate_price_averages_first_five() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/identity/v1/oauth2/token");
            then.status(200).json_body(json!({"access_token": "tok"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/buy/browse/v1/item_summary/search");
            then.status(200).json_body(json!({
                "itemSummaries": [
                    {"itemId": "1", "price": {"value": "10.00"}},
                    {"itemId": "2", "price": {"value": "20.00"}},
                    {"itemId": "3", "price": {"value": "0.00"}},
                    {"itemId": "4", "price": {"value": "30.00"}},
                    {"itemId": "5", "price": {"value": "40.00"}},
                    {"itemId": "6", "price": {"value": "1000.00"}}
                ]
            }));
        })
        .await;

    let estimate = client_for(&server).estimate_price("Wemby", 2023, "Prizm").await;
    assert_eq!(estimate, Some(25.0));
}
