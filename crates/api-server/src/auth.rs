use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::json;

use crate::config::AuthConfig;
use crate::AppState;

#[cfg(test)]
#[path = "auth_tests.rs"]
mod auth_tests;

/// Claims read from the bearer token. Only `sub` is required.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Claims {
    sub: Option<String>,
    email: Option<String>,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

/// Validates bearer JWTs.
///
/// With a secret configured, HS256 signatures and `exp` are checked, plus
/// audience and issuer when set. Without one, claims are read as-is
/// (development mode).
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
    verified: bool,
}

impl JwtVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        match &config.jwt_secret {
            Some(secret) => {
                let mut validation = Validation::new(Algorithm::HS256);
                match &config.audience {
                    Some(aud) => validation.set_audience(&[aud]),
                    None => validation.validate_aud = false,
                }
                if let Some(iss) = &config.issuer {
                    validation.set_issuer(&[iss]);
                }
                Self {
                    key: DecodingKey::from_secret(secret.as_bytes()),
                    validation,
                    verified: true,
                }
            }
            None => {
                let mut validation = Validation::default();
                validation.insecure_disable_signature_validation();
                validation.validate_exp = false;
                validation.validate_aud = false;
                validation.required_spec_claims.clear();
                Self {
                    key: DecodingKey::from_secret(&[]),
                    validation,
                    verified: false,
                }
            }
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let user_id = data
            .claims
            .sub
            .filter(|s| !s.trim().is_empty())
            .ok_or(AuthError::MissingSubject)?;

        Ok(AuthUser {
            user_id,
            email: data.claims.email.filter(|e| !e.trim().is_empty()),
        })
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let user = state.auth.authenticate(token).map_err(|e| {
            tracing::warn!("Rejected token: {}", e);
            e
        })?;
        tracing::debug!("Authenticated user {}", user.user_id);
        Ok(user)
    }
}

/// Authentication errors
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken(String),
    MissingSubject,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing bearer token"),
            AuthError::InvalidToken(e) => write!(f, "JWT validation failed: {}", e),
            AuthError::MissingSubject => write!(f, "Invalid JWT: missing user_id"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            AuthError::MissingToken => {
                "Not authenticated. Provide Authorization: Bearer <token>.".to_string()
            }
            other => other.to_string(),
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "error": message,
            })),
        )
            .into_response()
    }
}
