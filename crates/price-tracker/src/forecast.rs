//! Linear trend forecast over observed sale prices.

use card_core::{round2, CardError, PriceItem, PriceSummary};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MIN_FORECAST_DAYS: u32 = 1;
pub const MAX_FORECAST_DAYS: u32 = 30;
pub const DEFAULT_FORECAST_DAYS: u32 = 7;

/// Daily slope (in dollars) beyond which a trend is called.
const TREND_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ForecastPoint {
    pub date: String,
    pub predicted_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Forecast {
    pub card_name: String,
    pub current_price: f64,
    pub predictions: Vec<ForecastPoint>,
    pub trend: Trend,
    /// Dollars per day
    pub slope: f64,
    pub volatility: f64,
    /// R² of the fit, 0-1
    pub confidence: f64,
    pub forecast_period: String,
    pub data_points: usize,
}

struct Fit {
    slope: f64,
    intercept: f64,
    r_squared: f64,
}

fn least_squares(points: &[(f64, f64)]) -> Fit {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    let sxy: f64 = points.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;

    let ss_tot: f64 = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 };

    Fit {
        slope,
        intercept,
        r_squared,
    }
}

/// Population standard deviation of consecutive price changes.
fn volatility(prices: &[f64]) -> f64 {
    if prices.len() < 2 {
        return 0.0;
    }
    let diffs: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / diffs.len() as f64;
    variance.sqrt()
}

/// Forecast `days` ahead from the items in `summary`.
pub fn forecast(card_name: &str, summary: &PriceSummary, days: u32) -> Result<Forecast, CardError> {
    if !(MIN_FORECAST_DAYS..=MAX_FORECAST_DAYS).contains(&days) {
        return Err(CardError::InvalidInput(format!(
            "days must be between {} and {}",
            MIN_FORECAST_DAYS, MAX_FORECAST_DAYS
        )));
    }
    if summary.items.len() < 2 {
        return Err(CardError::InvalidInput(
            "At least 2 price points are needed for a forecast".to_string(),
        ));
    }

    let mut items: Vec<&PriceItem> = summary.items.iter().collect();
    items.sort_by(|a, b| a.date.cmp(&b.date));

    let dates: Vec<Option<NaiveDate>> = items
        .iter()
        .map(|i| NaiveDate::parse_from_str(&i.date, "%Y-%m-%d").ok())
        .collect();
    let all_dated = dates.iter().all(Option::is_some);
    let first = dates.first().copied().flatten();

    // x is days since the first sale when every item is dated, else the index
    let points: Vec<(f64, f64)> = items
        .iter()
        .zip(&dates)
        .enumerate()
        .map(|(idx, (item, date))| {
            let x = match (all_dated, first, date) {
                (true, Some(first), Some(date)) => (*date - first).num_days() as f64,
                _ => idx as f64,
            };
            (x, item.price)
        })
        .collect();

    let fit = least_squares(&points);
    let last_x = points.last().map(|(x, _)| *x).unwrap_or(0.0);
    let last_date = dates
        .last()
        .copied()
        .flatten()
        .unwrap_or_else(|| chrono::Utc::now().date_naive());

    let predictions = (1..=days)
        .map(|step| {
            let x = last_x + step as f64;
            ForecastPoint {
                date: (last_date + Duration::days(step as i64))
                    .format("%Y-%m-%d")
                    .to_string(),
                predicted_price: round2((fit.intercept + fit.slope * x).max(0.0)),
            }
        })
        .collect();

    let trend = if fit.slope > TREND_THRESHOLD {
        Trend::Bullish
    } else if fit.slope < -TREND_THRESHOLD {
        Trend::Bearish
    } else {
        Trend::Stable
    };

    let prices: Vec<f64> = items.iter().map(|i| i.price).collect();
    let confidence = if points.len() < 3 {
        0.0
    } else {
        fit.r_squared.clamp(0.0, 1.0)
    };

    Ok(Forecast {
        card_name: card_name.to_string(),
        current_price: summary.avg_price,
        predictions,
        trend,
        slope: round2(fit.slope),
        volatility: round2(volatility(&prices)),
        confidence: round2(confidence),
        forecast_period: format!("{} days", days),
        data_points: points.len(),
    })
}
