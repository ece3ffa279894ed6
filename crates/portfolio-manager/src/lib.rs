pub mod models;
pub mod db;
pub mod portfolio;
pub mod alerts;
pub mod preferences;

pub use db::PortfolioDb;
pub use models::*;
pub use portfolio::{is_positive_price, roi_percentage, summarize, PortfolioManager, EMPTY_EXPORT};
pub use alerts::AlertManager;
pub use preferences::PreferencesManager;
