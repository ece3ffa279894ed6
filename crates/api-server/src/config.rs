use anyhow::{Context, Result};
use ebay_client::{EbayConfig, EbayEnvironment};
use notification_service::NotificationConfig;
use price_tracker::TrackerConfig;
use sentiment_analysis::SentimentConfig;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:3001",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3001",
];

/// Load `.env` files. Secrets in `~/.env` never override the process
/// environment; project files override both.
pub fn load_environment() {
    if let Some(home) = dirs::home_dir() {
        load_env_file(&home.join(".env"), false);
    }
    load_env_file(Path::new(".env"), true);
    load_env_file(Path::new("config/.env"), true);
}

fn load_env_file(path: &Path, overwrite: bool) {
    if !path.exists() {
        return;
    }
    let result = if overwrite {
        dotenvy::from_path_override(path)
    } else {
        dotenvy::from_path(path)
    };
    match result {
        Ok(()) => tracing::info!("Loaded environment from {}", path.display()),
        Err(e) => tracing::warn!("Failed to load {}: {}", path.display(), e),
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// HS256 secret. Unset means tokens are decoded without verification.
    pub jwt_secret: Option<String>,
    pub audience: Option<String>,
    pub issuer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub ebay: EbayConfig,
    pub tracker: TrackerConfig,
    pub sentiment: SentimentConfig,
    pub notifications: NotificationConfig,
    pub auth: AuthConfig,
    pub cors_origins: Vec<String>,
    pub upload_dir: PathBuf,
    pub default_user_email: Option<String>,
    /// 0 disables the periodic alert check
    pub alert_check_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: "sqlite:dimedrop.db".to_string(),
            ebay: EbayConfig {
                app_id: None,
                cert_id: None,
                environment: EbayEnvironment::Production,
            },
            tracker: TrackerConfig::default(),
            sentiment: SentimentConfig::default(),
            notifications: NotificationConfig::default(),
            auth: AuthConfig::default(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            upload_dir: PathBuf::from("uploads"),
            default_user_email: None,
            alert_check_interval_secs: 0,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(p) => p.trim().parse().context("PORT must be a number")?,
            None => defaults.port,
        };
        let alert_check_interval_secs = match var("ALERT_CHECK_INTERVAL_SECS") {
            Some(s) => s
                .trim()
                .parse()
                .context("ALERT_CHECK_INTERVAL_SECS must be a number of seconds")?,
            None => defaults.alert_check_interval_secs,
        };
        let cors_origins = var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            ebay: EbayConfig::from_env(),
            tracker: TrackerConfig::from_env(),
            sentiment: SentimentConfig::from_env(),
            notifications: NotificationConfig::from_env(),
            auth: AuthConfig {
                jwt_secret: var("AUTH_JWT_SECRET"),
                audience: var("AUTH_AUDIENCE"),
                issuer: var("AUTH_ISSUER"),
            },
            cors_origins,
            upload_dir: var("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            default_user_email: var("DEFAULT_USER_EMAIL"),
            alert_check_interval_secs,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
