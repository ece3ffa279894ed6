use async_trait::async_trait;

use crate::CardError;

/// Anything that can quote a current market price for a card.
///
/// Portfolio valuation and alert evaluation only need a single number per
/// card, so they depend on this trait instead of the full price tracker.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn current_price(&self, card_name: &str) -> Result<f64, CardError>;
}

/// Fixed-price source keyed by lower-cased card name. Falls back to `default`
/// for unknown cards; `None` as default makes unknown cards an error.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceSource {
    prices: std::collections::HashMap<String, f64>,
    default: Option<f64>,
}

impl StaticPriceSource {
    pub fn new(default: Option<f64>) -> Self {
        Self {
            prices: Default::default(),
            default,
        }
    }

    pub fn with_price(mut self, card_name: &str, price: f64) -> Self {
        self.prices.insert(card_name.to_lowercase(), price);
        self
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn current_price(&self, card_name: &str) -> Result<f64, CardError> {
        self.prices
            .get(&card_name.to_lowercase())
            .copied()
            .or(self.default)
            .ok_or_else(|| CardError::NotFound(format!("No price for {}", card_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_lookup_is_case_insensitive() {
        let source = StaticPriceSource::new(None).with_price("Wembanyama Prizm", 152.5);
        assert_eq!(source.current_price("wembanyama prizm").await.unwrap(), 152.5);
        assert!(source.current_price("Unknown").await.is_err());
    }

    #[tokio::test]
    async fn test_static_source_default() {
        let source = StaticPriceSource::new(Some(35.0));
        assert_eq!(source.current_price("Anything").await.unwrap(), 35.0);
    }
}
