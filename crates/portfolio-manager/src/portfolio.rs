use crate::db::PortfolioDb;
use crate::models::*;
use anyhow::Result;
use card_core::{now_timestamp, round2, CardError, PriceSource};
use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

pub const EMPTY_EXPORT: &str = "No portfolio data available";

const CSV_HEADER: [&str; 9] = [
    "Card Name",
    "Buy Price",
    "Current Price",
    "Quantity",
    "Condition",
    "Total Investment",
    "Current Value",
    "ROI %",
    "Purchase Date",
];

pub struct PortfolioManager {
    db: PortfolioDb,
}

/// Finite and strictly positive; NaN and infinities are rejected.
pub fn is_positive_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// ROI in percent, rounded to cents. Zero investment yields 0.
pub fn roi_percentage(total_investment: f64, current_value: f64) -> f64 {
    if total_investment > 0.0 {
        round2((current_value - total_investment) / total_investment * 100.0)
    } else {
        0.0
    }
}

fn value_entry(entry: PortfolioEntry, current_price: f64) -> PortfolioCard {
    let quantity = entry.quantity as f64;
    let total_investment = round2(entry.buy_price * quantity);
    let current_value = round2(current_price * quantity);

    PortfolioCard {
        id: entry.id,
        card_name: entry.card_name,
        buy_price: entry.buy_price,
        current_price,
        quantity: entry.quantity,
        condition: entry
            .condition
            .unwrap_or_else(|| DEFAULT_CONDITION.to_string()),
        total_investment,
        current_value,
        roi_percentage: roi_percentage(total_investment, current_value),
        purchase_date: entry.purchase_date,
        notes: entry.notes,
        created_at: entry.created_at,
    }
}

fn validate_purchase_date(date: Option<&str>) -> Result<String> {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => {
            NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| {
                CardError::InvalidInput("Invalid date format. Use YYYY-MM-DD".to_string())
            })?;
            Ok(d.to_string())
        }
        None => Ok(Utc::now().format("%Y-%m-%d").to_string()),
    }
}

impl PortfolioManager {
    pub fn new(db: PortfolioDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &PortfolioDb {
        &self.db
    }

    /// Add a purchased card and value it at the current market price
    pub async fn add_card(
        &self,
        user_id: &str,
        card: NewCard,
        prices: &dyn PriceSource,
    ) -> Result<PortfolioCard> {
        if card.card_name.trim().is_empty() {
            return Err(CardError::InvalidInput("card_name is required".to_string()).into());
        }
        if !is_positive_price(card.buy_price) || card.quantity <= 0 {
            return Err(CardError::InvalidInput(
                "Buy price and quantity must be positive".to_string(),
            )
            .into());
        }

        let entry = self.insert(user_id, card).await?;
        let current_price = self.price_or_buy_price(&entry, prices).await;

        tracing::info!(
            "Added {} to portfolio: {} cards at ${} each",
            entry.card_name,
            entry.quantity,
            entry.buy_price
        );
        Ok(value_entry(entry, current_price))
    }

    /// Store a card from an image upload; the price may be unknown (0).
    pub async fn add_scanned_card(&self, user_id: &str, card: NewCard) -> Result<PortfolioEntry> {
        if card.card_name.trim().is_empty() {
            return Err(CardError::InvalidInput("card_name is required".to_string()).into());
        }
        let card = NewCard {
            buy_price: if card.buy_price.is_finite() { card.buy_price.max(0.0) } else { 0.0 },
            quantity: card.quantity.max(1),
            ..card
        };
        self.insert(user_id, card).await
    }

    async fn insert(&self, user_id: &str, card: NewCard) -> Result<PortfolioEntry> {
        let purchase_date = validate_purchase_date(card.purchase_date.as_deref())?;
        let condition = card
            .condition
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONDITION.to_string());
        let now = now_timestamp();

        let entry = sqlx::query_as::<_, PortfolioEntry>(
            r#"
            INSERT INTO portfolio (user_id, card_name, buy_price, quantity, condition,
                                   purchase_date, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(card.card_name.trim())
        .bind(card.buy_price)
        .bind(card.quantity)
        .bind(&condition)
        .bind(&purchase_date)
        .bind(&card.notes)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.db.pool())
        .await?;

        Ok(entry)
    }

    /// Raw rows for a user, newest first
    pub async fn get_entries(&self, user_id: &str) -> Result<Vec<PortfolioEntry>> {
        let entries = sqlx::query_as::<_, PortfolioEntry>(
            "SELECT * FROM portfolio WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(entries)
    }

    /// The user's cards valued at current prices
    pub async fn get_portfolio(
        &self,
        user_id: &str,
        prices: &dyn PriceSource,
    ) -> Result<Vec<PortfolioCard>> {
        let entries = self.get_entries(user_id).await?;

        let mut cards = Vec::with_capacity(entries.len());
        for entry in entries {
            let current_price = self.price_or_buy_price(&entry, prices).await;
            cards.push(value_entry(entry, current_price));
        }

        Ok(cards)
    }

    async fn price_or_buy_price(&self, entry: &PortfolioEntry, prices: &dyn PriceSource) -> f64 {
        match prices.current_price(&entry.card_name).await {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!(
                    "Price lookup failed for {}, using buy price: {}",
                    entry.card_name,
                    e
                );
                entry.buy_price
            }
        }
    }

    /// Returns false when the card does not exist or belongs to someone else
    pub async fn delete_card(&self, user_id: &str, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM portfolio WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn export_csv(&self, user_id: &str, prices: &dyn PriceSource) -> Result<String> {
        let cards = self.get_portfolio(user_id, prices).await?;
        if cards.is_empty() {
            return Ok(EMPTY_EXPORT.to_string());
        }

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;

        for card in &cards {
            writer.write_record([
                card.card_name.clone(),
                card.buy_price.to_string(),
                card.current_price.to_string(),
                card.quantity.to_string(),
                card.condition.clone(),
                card.total_investment.to_string(),
                card.current_value.to_string(),
                card.roi_percentage.to_string(),
                card.purchase_date.clone().unwrap_or_default(),
            ])?;
        }

        let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e))?;
        let csv = String::from_utf8(bytes)?;
        Ok(csv.trim_end().to_string())
    }
}

/// Portfolio totals. Sums in `Decimal` so cents add up exactly.
pub fn summarize(cards: &[PortfolioCard]) -> PortfolioSummary {
    let to_dec = |v: f64| Decimal::from_f64(v).unwrap_or_default();

    let total_investment: Decimal = cards.iter().map(|c| to_dec(c.total_investment)).sum();
    let total_value: Decimal = cards.iter().map(|c| to_dec(c.current_value)).sum();

    let total_investment = total_investment.to_f64().unwrap_or(0.0);
    let total_value = total_value.to_f64().unwrap_or(0.0);

    PortfolioSummary {
        total_investment: round2(total_investment),
        total_value: round2(total_value),
        total_roi_percentage: roi_percentage(total_investment, total_value),
        card_count: cards.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_core::StaticPriceSource;

    async fn setup_test_db() -> PortfolioDb {
        PortfolioDb::new("sqlite::memory:").await.unwrap()
    }

    fn card(name: &str, buy_price: f64, quantity: i64) -> NewCard {
        NewCard {
            card_name: name.to_string(),
            buy_price,
            quantity,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_card_values_holding() {
        let manager = PortfolioManager::new(setup_test_db().await);
        let prices = StaticPriceSource::new(None).with_price("Wemby Prizm", 150.0);

        let added = manager
            .add_card("user-1", card("Wemby Prizm", 100.0, 2), &prices)
            .await
            .unwrap();

        assert_eq!(added.total_investment, 200.0);
        assert_eq!(added.current_value, 300.0);
        assert_eq!(added.roi_percentage, 50.0);
        assert_eq!(added.condition, "Raw");
        assert!(added.purchase_date.is_some());
    }

    #[tokio::test]
    async fn test_add_card_rejects_non_positive_values() {
        let manager = PortfolioManager::new(setup_test_db().await);
        let prices = StaticPriceSource::new(Some(10.0));

        let err = manager
            .add_card("user-1", card("Wemby", 0.0, 1), &prices)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CardError>(),
            Some(CardError::InvalidInput(_))
        ));
        assert!(manager
            .add_card("user-1", card("Wemby", 10.0, 0), &prices)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_add_card_rejects_non_finite_price() {
        let manager = PortfolioManager::new(setup_test_db().await);
        let prices = StaticPriceSource::new(Some(10.0));

        for price in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = manager
                .add_card("user-1", card("Wemby", price, 1), &prices)
                .await
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<CardError>(),
                Some(CardError::InvalidInput(_))
            ));
        }
        assert!(manager.get_entries("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_card_rejects_bad_date() {
        let manager = PortfolioManager::new(setup_test_db().await);
        let prices = StaticPriceSource::new(Some(10.0));
        let mut new_card = card("Wemby", 10.0, 1);
        new_card.purchase_date = Some("10/01/2025".to_string());

        assert!(manager.add_card("user-1", new_card, &prices).await.is_err());
    }

    #[tokio::test]
    async fn test_price_failure_falls_back_to_buy_price() {
        let manager = PortfolioManager::new(setup_test_db().await);
        let no_prices = StaticPriceSource::new(None);

        manager
            .add_card("user-1", card("Obscure Card", 25.0, 1), &no_prices)
            .await
            .unwrap();
        let cards = manager.get_portfolio("user-1", &no_prices).await.unwrap();

        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].current_price, 25.0);
        assert_eq!(cards[0].roi_percentage, 0.0);
    }

    #[tokio::test]
    async fn test_users_only_see_their_own_cards() {
        let manager = PortfolioManager::new(setup_test_db().await);
        let prices = StaticPriceSource::new(Some(10.0));

        let mine = manager
            .add_card("alice", card("Card A", 5.0, 1), &prices)
            .await
            .unwrap();
        manager
            .add_card("bob", card("Card B", 5.0, 1), &prices)
            .await
            .unwrap();

        let alice = manager.get_portfolio("alice", &prices).await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].card_name, "Card A");

        assert!(!manager.delete_card("bob", mine.id).await.unwrap());
        assert!(manager.delete_card("alice", mine.id).await.unwrap());
        assert!(manager.get_portfolio("alice", &prices).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_portfolio_newest_first() {
        let manager = PortfolioManager::new(setup_test_db().await);
        let prices = StaticPriceSource::new(Some(10.0));

        manager.add_card("u", card("First", 1.0, 1), &prices).await.unwrap();
        manager.add_card("u", card("Second", 1.0, 1), &prices).await.unwrap();

        let cards = manager.get_portfolio("u", &prices).await.unwrap();
        assert_eq!(cards[0].card_name, "Second");
        assert_eq!(cards[1].card_name, "First");
    }

    #[tokio::test]
    async fn test_scanned_card_allows_zero_price() {
        let manager = PortfolioManager::new(setup_test_db().await);
        let entry = manager
            .add_scanned_card("u", card("Scanned", 0.0, 1))
            .await
            .unwrap();
        assert_eq!(entry.buy_price, 0.0);

        let cards = manager
            .get_portfolio("u", &StaticPriceSource::new(Some(12.0)))
            .await
            .unwrap();
        assert_eq!(cards[0].roi_percentage, 0.0);
        assert_eq!(cards[0].current_value, 12.0);
    }

    #[test]
    fn test_summarize() {
        let cards = vec![
            value_entry(entry("A", 10.0, 3), 12.5),
            value_entry(entry("B", 50.0, 1), 40.0),
        ];
        let summary = summarize(&cards);

        assert_eq!(summary.total_investment, 80.0);
        assert_eq!(summary.total_value, 77.5);
        assert_eq!(summary.total_roi_percentage, -3.13);
        assert_eq!(summary.card_count, 2);

        let empty = summarize(&[]);
        assert_eq!(empty.total_roi_percentage, 0.0);
    }

    fn entry(name: &str, buy_price: f64, quantity: i64) -> PortfolioEntry {
        PortfolioEntry {
            id: 1,
            user_id: "u".to_string(),
            card_name: name.to_string(),
            buy_price,
            quantity,
            condition: None,
            purchase_date: None,
            notes: None,
            created_at: now_timestamp(),
            updated_at: now_timestamp(),
        }
    }

    #[tokio::test]
    async fn test_export_csv() {
        let manager = PortfolioManager::new(setup_test_db().await);
        let prices = StaticPriceSource::new(Some(20.0));

        assert_eq!(manager.export_csv("u", &prices).await.unwrap(), EMPTY_EXPORT);

        let mut new_card = card("Luka, Prizm", 10.0, 2);
        new_card.purchase_date = Some("2025-01-15".to_string());
        manager.add_card("u", new_card, &prices).await.unwrap();

        let csv = manager.export_csv("u", &prices).await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Card Name,Buy Price,Current Price,Quantity,Condition,Total Investment,Current Value,ROI %,Purchase Date"
        );
        assert_eq!(lines[1], "\"Luka, Prizm\",10,20,2,Raw,20,40,100,2025-01-15");
        assert_eq!(lines.len(), 2);
    }
}
