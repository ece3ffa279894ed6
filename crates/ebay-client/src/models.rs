//! Browse API `item_summary/search` response shapes.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub item_summaries: Vec<ItemSummary>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ItemSummary {
    pub item_id: String,
    #[serde(default)]
    pub title: String,
    pub price: Option<Amount>,
    pub current_bid_price: Option<Amount>,
    #[serde(default)]
    pub bid_count: u32,
    #[serde(default)]
    pub buying_options: Vec<String>,
    pub item_end_date: Option<String>,
    pub item_creation_date: Option<String>,
    pub image: Option<Image>,
    #[serde(default)]
    pub item_web_url: String,
    pub condition: Option<String>,
    pub seller: Option<Seller>,
    pub item_location: Option<ItemLocation>,
}

impl ItemSummary {
    /// Current bid for auctions, otherwise the fixed price.
    pub fn effective_price(&self) -> Option<f64> {
        self.current_bid_price
            .as_ref()
            .or(self.price.as_ref())
            .and_then(Amount::as_f64)
    }

    pub fn is_buy_it_now(&self) -> bool {
        self.buying_options.iter().any(|o| o == "FIXED_PRICE")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Amount {
    pub value: String,
    #[allow(dead_code)]
    pub currency: Option<String>,
}

impl Amount {
    pub fn as_f64(&self) -> Option<f64> {
        self.value.parse().ok()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Image {
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Seller {
    #[serde(default)]
    pub feedback_score: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemLocation {
    pub country: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let body = r#"{
            "total": 1,
            "itemSummaries": [{
                "itemId": "v1|1|0",
                "title": "Wemby Prizm RC",
                "price": {"value": "99.50", "currency": "USD"},
                "currentBidPrice": {"value": "120.00", "currency": "USD"},
                "bidCount": 4,
                "buyingOptions": ["AUCTION"],
                "itemEndDate": "2025-10-20T18:00:00.000Z",
                "itemWebUrl": "https://www.ebay.com/itm/1",
                "seller": {"feedbackScore": 321},
                "itemLocation": {"country": "US"}
            }]
        }"#;

        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.total, 1);
        let item = &parsed.item_summaries[0];
        assert_eq!(item.effective_price(), Some(120.0));
        assert!(!item.is_buy_it_now());
        assert_eq!(item.seller.as_ref().unwrap().feedback_score, 321);
    }

    #[test]
    fn test_empty_response_defaults() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.item_summaries.is_empty());
    }
}
