use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CardResult<T> = Result<T, CardError>;

impl CardError {
    /// The message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            CardError::InvalidInput(m)
            | CardError::NotFound(m)
            | CardError::RateLimited(m)
            | CardError::Unauthorized(m)
            | CardError::Api(m)
            | CardError::Database(m)
            | CardError::Config(m)
            | CardError::Internal(m) => m,
        }
    }
}
