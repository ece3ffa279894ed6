use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::EbayError;

const TOKEN_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";

/// Tokens are refreshed this long before they actually expire.
pub const REFRESH_BUFFER: Duration = Duration::from_secs(300);

/// eBay application tokens live for two hours.
pub const DEFAULT_TOKEN_EXPIRY_SECS: u64 = 7200;

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid_at(&self, now: Instant) -> bool {
        self.expires_at > now + REFRESH_BUFFER
    }
}

/// OAuth 2.0 client-credentials token manager.
///
/// Tokens are held in memory only. Concurrent callers share one refresh
/// because the cache sits behind an async mutex.
#[derive(Clone)]
pub struct EbayOAuth {
    app_id: String,
    cert_id: String,
    token_url: String,
    client: Client,
    token: Arc<Mutex<Option<CachedToken>>>,
    backoff_base: Duration,
}

impl EbayOAuth {
    pub fn new(app_id: impl Into<String>, cert_id: impl Into<String>, token_url: impl Into<String>) -> Result<Self, EbayError> {
        let app_id = app_id.into();
        let cert_id = cert_id.into();
        if app_id.is_empty() || cert_id.is_empty() {
            return Err(EbayError::Config(
                "EBAY_APP_ID and EBAY_CERT_ID are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let token_url = token_url.into();
        tracing::info!("eBay OAuth initialized ({})", token_url);

        Ok(Self {
            app_id,
            cert_id,
            token_url,
            client,
            token: Arc::new(Mutex::new(None)),
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Override the retry backoff base (1s by default: waits 1s, 2s, 4s).
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Return a valid access token, fetching a new one when the cached token
    /// is missing, inside the refresh buffer, or `force_refresh` is set.
    pub async fn get_access_token(&self, force_refresh: bool) -> Result<String, EbayError> {
        let mut guard = self.token.lock().await;

        if !force_refresh {
            if let Some(cached) = guard.as_ref() {
                if cached.is_valid_at(Instant::now()) {
                    tracing::debug!("Using cached eBay OAuth token");
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let response = self.fetch_new_token().await?;
        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EbayError::InvalidResponse("No access_token in response".to_string()))?;
        let expires_in = response.expires_in.unwrap_or(DEFAULT_TOKEN_EXPIRY_SECS);

        tracing::info!("eBay OAuth token obtained, expires in {}s", expires_in);

        *guard = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        });

        Ok(access_token)
    }

    async fn fetch_new_token(&self) -> Result<TokenResponse, EbayError> {
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            tracing::info!(
                "Fetching eBay OAuth token (attempt {}/{})",
                attempt + 1,
                MAX_ATTEMPTS
            );

            let result = self
                .client
                .post(&self.token_url)
                .basic_auth(&self.app_id, Some(&self.cert_id))
                .form(&[("grant_type", "client_credentials"), ("scope", TOKEN_SCOPE)])
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<TokenResponse>()
                            .await
                            .map_err(|e| EbayError::InvalidResponse(e.to_string()));
                    }

                    let body = response.text().await.unwrap_or_default();
                    if status.as_u16() == 401 {
                        tracing::error!("eBay OAuth failed: invalid credentials (401)");
                        return Err(EbayError::InvalidCredentials(body));
                    }
                    if !status.is_server_error() {
                        return Err(EbayError::Api {
                            status: status.as_u16(),
                            body,
                        });
                    }

                    tracing::warn!("eBay OAuth server error ({}), retrying", status);
                    last_error = Some(EbayError::Api {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(e) => {
                    tracing::warn!("eBay OAuth request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Some(EbayError::Request(e));
                }
            }

            if attempt + 1 < MAX_ATTEMPTS {
                let delay = self.backoff_base * 2u32.pow(attempt);
                tracing::info!("Backing off for {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EbayError::InvalidResponse("Failed to obtain OAuth token after all retries".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_validity_respects_refresh_buffer() {
        let now = Instant::now();
        let fresh = CachedToken {
            access_token: "t".to_string(),
            expires_at: now + Duration::from_secs(3600),
        };
        assert!(fresh.is_valid_at(now));

        let nearly_expired = CachedToken {
            access_token: "t".to_string(),
            expires_at: now + Duration::from_secs(120),
        };
        assert!(!nearly_expired.is_valid_at(now));
    }

    #[test]
    fn test_new_requires_credentials() {
        let result = EbayOAuth::new("", "cert", "http://localhost/token");
        assert!(matches!(result, Err(EbayError::Config(_))));
    }
}
