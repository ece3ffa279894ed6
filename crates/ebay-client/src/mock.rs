use card_core::{Listing, PriceItem, PriceSummary};
use chrono::{Duration, Utc};

const WEMBY_TERMS: [&str; 3] = ["wembanyama", "wemby", "prizm"];

/// Canned sold prices used when the eBay API is unavailable.
pub fn mock_price_summary(query: &str) -> PriceSummary {
    let lowered = query.to_lowercase();
    let is_wemby = WEMBY_TERMS.iter().any(|t| lowered.contains(t));

    let items = if is_wemby {
        vec![
            item(150.00, "2025-10-01", "Victor Wembanyama 2023-24 Prizm Rookie Card PSA 10"),
            item(145.50, "2025-10-03", "Wembanyama Prizm Silver Rookie #236 PSA 9"),
            item(160.00, "2025-10-05", "2023 Prizm Victor Wembanyama RC #236 BGS 9.5"),
            item(155.00, "2025-10-07", "Wembanyama Prizm Base Rookie PSA 10 Gem Mint"),
            item(152.00, "2025-10-09", "Victor Wembanyama 2023-24 Prizm #236 RC PSA 10"),
        ]
    } else {
        vec![
            item(45.00, "2025-10-01", &format!("{} Rookie Card PSA 9", query)),
            item(52.00, "2025-10-03", &format!("{} Base Rookie PSA 10", query)),
            item(48.50, "2025-10-05", &format!("{} RC BGS 9.5", query)),
            item(50.00, "2025-10-07", &format!("{} Rookie PSA 10", query)),
            item(49.00, "2025-10-09", &format!("{} RC Gem Mint", query)),
        ]
    };

    PriceSummary::from_items(items)
}

/// Two canned auction listings, truncated to `limit`.
pub fn mock_listings(card_name: &str, limit: usize) -> Vec<Listing> {
    let now = Utc::now();
    let listings = vec![
        Listing {
            item_id: "123456789".to_string(),
            title: format!("{} Rookie Card PSA 10", card_name),
            current_price: 150.00,
            buy_it_now: true,
            bid_count: 5,
            end_time: (now + Duration::days(3)).to_rfc3339(),
            image_url: Some("/mock-card.jpg".to_string()),
            view_item_url: "https://ebay.com/itm/123456789".to_string(),
            condition: "Near Mint".to_string(),
            seller_feedback_score: 98,
            location: "USA".to_string(),
        },
        Listing {
            item_id: "987654321".to_string(),
            title: format!("{} Silver Prizm RC", card_name),
            current_price: 200.00,
            buy_it_now: false,
            bid_count: 12,
            end_time: (now + Duration::days(5)).to_rfc3339(),
            image_url: Some("/mock-card2.jpg".to_string()),
            view_item_url: "https://ebay.com/itm/987654321".to_string(),
            condition: "Mint".to_string(),
            seller_feedback_score: 95,
            location: "Canada".to_string(),
        },
    ];

    listings.into_iter().take(limit).collect()
}

fn item(price: f64, date: &str, title: &str) -> PriceItem {
    PriceItem {
        price,
        date: date.to_string(),
        title: title.to_string(),
    }
}
