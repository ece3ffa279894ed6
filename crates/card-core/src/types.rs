use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::CardError;

/// RFC 3339 UTC with second precision, so stored timestamps sort as strings.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Round a money amount to cents, half away from zero.
pub fn round2(value: f64) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0)
}

/// A single observed sale / listing price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PriceItem {
    pub price: f64,
    /// YYYY-MM-DD
    pub date: String,
    pub title: String,
}

/// Aggregate over a set of price items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PriceSummary {
    pub items: Vec<PriceItem>,
    pub avg_price: f64,
    pub high: f64,
    pub low: f64,
    pub count: usize,
}

impl PriceSummary {
    pub fn from_items(items: Vec<PriceItem>) -> Self {
        if items.is_empty() {
            return Self {
                items,
                avg_price: 0.0,
                high: 0.0,
                low: 0.0,
                count: 0,
            };
        }

        let total: Decimal = items
            .iter()
            .filter_map(|i| Decimal::from_f64(i.price))
            .sum();
        let avg = (total / Decimal::from(items.len()))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .to_f64()
            .unwrap_or(0.0);

        let high = items.iter().map(|i| i.price).fold(f64::MIN, f64::max);
        let low = items.iter().map(|i| i.price).fold(f64::MAX, f64::min);

        Self {
            count: items.len(),
            items,
            avg_price: avg,
            high,
            low,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Where a price summary came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum DataSource {
    Ebay,
    Mock,
}

/// Active marketplace listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Listing {
    pub item_id: String,
    pub title: String,
    pub current_price: f64,
    pub buy_it_now: bool,
    pub bid_count: u32,
    pub end_time: String,
    pub image_url: Option<String>,
    pub view_item_url: String,
    pub condition: String,
    pub seller_feedback_score: i64,
    pub location: String,
}

/// Direction of a price alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AlertDirection {
    Above,
    Below,
}

impl AlertDirection {
    pub fn parse(s: &str) -> Result<Self, CardError> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(AlertDirection::Above),
            "below" => Ok(AlertDirection::Below),
            _ => Err(CardError::InvalidInput(
                "Alert type must be 'above' or 'below'".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertDirection::Above => "above",
            AlertDirection::Below => "below",
        }
    }

    /// Whether `current` crosses `target` in this direction (inclusive).
    pub fn is_triggered(&self, current: f64, target: f64) -> bool {
        match self {
            AlertDirection::Above => current >= target,
            AlertDirection::Below => current <= target,
        }
    }
}

impl TryFrom<String> for AlertDirection {
    type Error = CardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl std::fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: f64) -> PriceItem {
        PriceItem {
            price,
            date: "2025-10-01".to_string(),
            title: "card".to_string(),
        }
    }

    #[test]
    fn test_summary_from_items() {
        let summary = PriceSummary::from_items(vec![
            item(150.0),
            item(145.5),
            item(160.0),
            item(155.0),
            item(152.0),
        ]);
        assert_eq!(summary.count, 5);
        assert_eq!(summary.avg_price, 152.5);
        assert_eq!(summary.high, 160.0);
        assert_eq!(summary.low, 145.5);
    }

    #[test]
    fn test_summary_empty() {
        let summary = PriceSummary::from_items(vec![]);
        assert!(summary.is_empty());
        assert_eq!(summary.avg_price, 0.0);
        assert_eq!(summary.high, 0.0);
    }

    #[test]
    fn test_format_timestamp() {
        let at = DateTime::parse_from_rfc3339("2025-10-09T08:30:15.123Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(at), "2025-10-09T08:30:15Z");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.3456), 12.35);
        assert_eq!(round2(-1.004), -1.0);
        assert_eq!(round2(48.9), 48.9);
    }

    #[test]
    fn test_alert_direction_parse() {
        assert_eq!(AlertDirection::parse("Above").unwrap(), AlertDirection::Above);
        assert_eq!(AlertDirection::parse(" below ").unwrap(), AlertDirection::Below);
        assert!(matches!(
            AlertDirection::parse("sideways"),
            Err(CardError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_alert_direction_trigger_is_inclusive() {
        assert!(AlertDirection::Above.is_triggered(100.0, 100.0));
        assert!(!AlertDirection::Above.is_triggered(99.99, 100.0));
        assert!(AlertDirection::Below.is_triggered(100.0, 100.0));
        assert!(!AlertDirection::Below.is_triggered(100.01, 100.0));
    }
}
