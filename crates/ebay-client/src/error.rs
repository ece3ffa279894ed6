use card_core::CardError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EbayError {
    #[error("eBay credentials not configured: {0}")]
    Config(String),

    #[error("Invalid eBay credentials (check EBAY_APP_ID and EBAY_CERT_ID): {0}")]
    InvalidCredentials(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("eBay API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("eBay rate limit exceeded")]
    RateLimited,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<EbayError> for CardError {
    fn from(e: EbayError) -> Self {
        match e {
            EbayError::Config(msg) => CardError::Config(msg),
            EbayError::RateLimited => CardError::RateLimited(e.to_string()),
            other => CardError::Api(other.to_string()),
        }
    }
}
