mod error;
pub mod mock;
mod models;
pub mod oauth;

pub use error::EbayError;
pub use oauth::EbayOAuth;

use card_core::{DataSource, Listing, PriceItem, PriceSummary};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use models::{ItemSummary, SearchResponse};

/// eBay category for basketball trading cards.
pub const BASKETBALL_CARDS_CATEGORY: &str = "183454";

const MARKETPLACE_ID: &str = "EBAY_US";
const LISTINGS_FILTER: &str =
    "conditions:{USED},price:[50..5000],priceCurrency:USD,buyingOptions:{AUCTION}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EbayEnvironment {
    Production,
    Sandbox,
}

impl EbayEnvironment {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("sandbox") {
            EbayEnvironment::Sandbox
        } else {
            EbayEnvironment::Production
        }
    }

    pub fn api_base(&self) -> &'static str {
        match self {
            EbayEnvironment::Production => "https://api.ebay.com",
            EbayEnvironment::Sandbox => "https://api.sandbox.ebay.com",
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/identity/v1/oauth2/token", self.api_base())
    }
}

#[derive(Debug, Clone)]
pub struct EbayConfig {
    pub app_id: Option<String>,
    pub cert_id: Option<String>,
    pub environment: EbayEnvironment,
}

impl EbayConfig {
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            app_id: non_empty("EBAY_APP_ID"),
            cert_id: non_empty("EBAY_CERT_ID"),
            environment: EbayEnvironment::parse(
                &std::env::var("EBAY_ENVIRONMENT").unwrap_or_default(),
            ),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.app_id.is_some() && self.cert_id.is_some()
    }
}

/// Browse API client. Price lookups never fail: any problem falls back to
/// canned data and the returned [`DataSource`] says which was used.
#[derive(Clone)]
pub struct EbayClient {
    client: Client,
    oauth: Option<EbayOAuth>,
    api_base: String,
}

impl EbayClient {
    pub fn new(config: EbayConfig) -> Self {
        let api_base = config.environment.api_base().to_string();
        let token_url = config.environment.token_url();
        Self::with_base_urls(config, api_base, token_url)
    }

    /// Point the client at alternative API and token endpoints.
    pub fn with_base_urls(
        config: EbayConfig,
        api_base: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        let oauth = match (config.app_id, config.cert_id) {
            (Some(app_id), Some(cert_id)) => match EbayOAuth::new(app_id, cert_id, token_url) {
                Ok(oauth) => Some(oauth),
                Err(e) => {
                    tracing::warn!("eBay OAuth unavailable, using mock data: {}", e);
                    None
                }
            },
            _ => {
                tracing::warn!("EBAY_APP_ID / EBAY_CERT_ID not set, eBay client will serve mock data");
                None
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            oauth,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Shorten the OAuth retry backoff (used by tests).
    pub fn with_oauth_backoff(mut self, base: Duration) -> Self {
        self.oauth = self.oauth.map(|o| o.with_backoff_base(base));
        self
    }

    pub fn is_configured(&self) -> bool {
        self.oauth.is_some()
    }

    /// Recent prices for `query`, or mock prices when eBay is unavailable.
    pub async fn search_sold_prices(&self, query: &str, limit: usize) -> (PriceSummary, DataSource) {
        if self.oauth.is_none() {
            tracing::warn!("eBay credentials not configured, using mock data for '{}'", query);
            return (mock::mock_price_summary(query), DataSource::Mock);
        }

        let params = vec![
            ("q", format!("{} basketball card", query)),
            ("category_ids", BASKETBALL_CARDS_CATEGORY.to_string()),
            ("limit", limit.clamp(1, 200).to_string()),
        ];

        match self.browse_search(&params).await {
            Ok(response) => {
                let items: Vec<PriceItem> = response
                    .item_summaries
                    .iter()
                    .filter_map(to_price_item)
                    .collect();

                if items.is_empty() {
                    tracing::warn!("eBay returned no priced items for '{}', using mock data", query);
                    return (mock::mock_price_summary(query), DataSource::Mock);
                }

                tracing::info!("eBay returned {} priced items for '{}'", items.len(), query);
                (PriceSummary::from_items(items), DataSource::Ebay)
            }
            Err(e) => {
                tracing::error!("eBay price search failed for '{}': {}", query, e);
                (mock::mock_price_summary(query), DataSource::Mock)
            }
        }
    }

    /// Used-condition auctions between $50 and $5000, ending soonest.
    pub async fn search_listings(&self, card_name: &str, limit: usize) -> Vec<Listing> {
        if self.oauth.is_none() {
            tracing::warn!("eBay credentials not configured, using mock listings");
            return mock::mock_listings(card_name, limit);
        }

        let params = vec![
            ("q", format!("{} basketball card -graded -slab -psa -beckett", card_name)),
            ("category_ids", BASKETBALL_CARDS_CATEGORY.to_string()),
            ("filter", LISTINGS_FILTER.to_string()),
            ("sort", "endingSoonest".to_string()),
            ("limit", limit.clamp(1, 200).to_string()),
        ];

        match self.browse_search(&params).await {
            Ok(response) => {
                let listings: Vec<Listing> = response
                    .item_summaries
                    .into_iter()
                    .filter_map(to_listing)
                    .take(limit)
                    .collect();
                tracing::info!("Fetched {} eBay listings for '{}'", listings.len(), card_name);
                listings
            }
            Err(e) => {
                tracing::error!("eBay listing search failed for '{}': {}", card_name, e);
                mock::mock_listings(card_name, limit)
            }
        }
    }

    /// Mean of the first five positive prices for a card, `None` when eBay
    /// is unavailable or has nothing to offer.
    pub async fn estimate_price(&self, player: &str, year: i32, card_set: &str) -> Option<f64> {
        self.oauth.as_ref()?;

        let params = vec![
            ("q", format!("{} {} {} basketball card", player, year, card_set)),
            ("filter", "conditions:{USED},priceCurrency:USD".to_string()),
            ("limit", "10".to_string()),
        ];

        let response = match self.browse_search(&params).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("eBay price estimate failed for {}: {}", player, e);
                return None;
            }
        };

        let prices: Vec<f64> = response
            .item_summaries
            .iter()
            .take(5)
            .filter_map(ItemSummary::effective_price)
            .filter(|p| *p > 0.0)
            .collect();

        if prices.is_empty() {
            return None;
        }
        Some(prices.iter().sum::<f64>() / prices.len() as f64)
    }

    /// Call `item_summary/search`, refreshing the token once on a 401.
    async fn browse_search(&self, params: &[(&str, String)]) -> Result<SearchResponse, EbayError> {
        let oauth = self
            .oauth
            .as_ref()
            .ok_or_else(|| EbayError::Config("eBay OAuth not configured".to_string()))?;
        let url = format!("{}/buy/browse/v1/item_summary/search", self.api_base);

        let mut force_refresh = false;
        loop {
            let token = oauth.get_access_token(force_refresh).await?;
            let response = self
                .client
                .get(&url)
                .bearer_auth(&token)
                .header("X-EBAY-C-MARKETPLACE-ID", MARKETPLACE_ID)
                .query(params)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && !force_refresh {
                tracing::warn!("eBay rejected the access token, refreshing");
                force_refresh = true;
                continue;
            }
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(EbayError::RateLimited);
            }
            if !status.is_success() {
                return Err(EbayError::Api {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }

            return response
                .json::<SearchResponse>()
                .await
                .map_err(|e| EbayError::InvalidResponse(e.to_string()));
        }
    }
}

fn to_price_item(item: &ItemSummary) -> Option<PriceItem> {
    let price = item.effective_price().filter(|p| *p > 0.0)?;
    let date = item
        .item_creation_date
        .as_deref()
        .or(item.item_end_date.as_deref())
        .and_then(|d| d.get(..10))
        .map(str::to_string)
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());

    Some(PriceItem {
        price,
        date,
        title: item.title.clone(),
    })
}

fn to_listing(item: ItemSummary) -> Option<Listing> {
    let current_price = item.effective_price()?;
    let buy_it_now = item.is_buy_it_now();

    Some(Listing {
        item_id: item.item_id,
        title: item.title,
        current_price,
        buy_it_now,
        bid_count: item.bid_count,
        end_time: item.item_end_date.unwrap_or_default(),
        image_url: item.image.and_then(|i| i.image_url),
        view_item_url: item.item_web_url,
        condition: item.condition.unwrap_or_else(|| "Unknown".to_string()),
        seller_feedback_score: item.seller.map(|s| s.feedback_score).unwrap_or(0),
        location: item
            .item_location
            .and_then(|l| l.country)
            .unwrap_or_else(|| "N/A".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured() -> EbayClient {
        EbayClient::new(EbayConfig {
            app_id: None,
            cert_id: None,
            environment: EbayEnvironment::Production,
        })
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(EbayEnvironment::parse("Sandbox"), EbayEnvironment::Sandbox);
        assert_eq!(EbayEnvironment::parse(""), EbayEnvironment::Production);
        assert_eq!(
            EbayEnvironment::Sandbox.token_url(),
            "https://api.sandbox.ebay.com/identity/v1/oauth2/token"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_client_serves_mock() {
        let client = unconfigured();
        assert!(!client.is_configured());

        let (summary, source) = client.search_sold_prices("Wemby Prizm", 50).await;
        assert_eq!(source, DataSource::Mock);
        assert_eq!(summary.avg_price, 152.5);

        let listings = client.search_listings("Wemby", 1).await;
        assert_eq!(listings.len(), 1);

        assert_eq!(client.estimate_price("Wemby", 2023, "Prizm").await, None);
    }
}
