use argon2::Argon2;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use serde::{Deserialize, Serialize};

use crate::models::{errors::AppError, messages, user::User};
use crate::repository::users;
use crate::utils::config::AppConfig;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    AccessToken,
    RefreshToken,
    EmailToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub scope: TokenScope,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Password hashing and JWT issuing for all three token scopes
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: i64,
    refresh_ttl: i64,
    email_ttl: i64,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: config.access_token_ttl_seconds,
            refresh_ttl: config.refresh_token_ttl_seconds,
            email_ttl: config.email_token_ttl_seconds,
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::internal_error(format!("Failed to hash password: {}", e)))
    }

    /// A malformed stored hash never verifies
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Access token; `ttl_seconds` overrides the configured lifetime
    pub fn create_access_token(
        &self,
        email: &str,
        ttl_seconds: Option<i64>,
    ) -> Result<String, AppError> {
        self.issue(email, TokenScope::AccessToken, ttl_seconds.unwrap_or(self.access_ttl))
    }

    pub fn create_refresh_token(&self, email: &str) -> Result<String, AppError> {
        self.issue(email, TokenScope::RefreshToken, self.refresh_ttl)
    }

    pub fn create_email_token(&self, email: &str) -> Result<String, AppError> {
        self.issue(email, TokenScope::EmailToken, self.email_ttl)
    }

    /// Returns the e-mail carried by a valid access token
    pub fn decode_access_token(&self, token: &str) -> Result<String, AppError> {
        let claims = self
            .verify(token)
            .ok_or_else(|| AppError::unauthorized(messages::NOT_VALIDATE_CREDENTIALS))?;
        if claims.scope != TokenScope::AccessToken {
            return Err(AppError::unauthorized(messages::INVALID_SCOPE));
        }
        Ok(claims.sub)
    }

    pub fn decode_refresh_token(&self, token: &str) -> Result<String, AppError> {
        let claims = self
            .verify(token)
            .ok_or_else(|| AppError::unauthorized(messages::NOT_VALIDATE_CREDENTIALS))?;
        if claims.scope != TokenScope::RefreshToken {
            return Err(AppError::unauthorized(messages::INVALID_SCOPE));
        }
        Ok(claims.sub)
    }

    pub fn email_from_token(&self, token: &str) -> Result<String, AppError> {
        let claims = self
            .verify(token)
            .ok_or_else(|| AppError::token_error(messages::FAIL_EMAIL_VERIFICATION))?;
        if claims.scope != TokenScope::EmailToken {
            return Err(AppError::unauthorized(messages::INVALID_SCOPE));
        }
        Ok(claims.sub)
    }

    fn issue(&self, email: &str, scope: TokenScope, ttl_seconds: i64) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: email.to_string(),
            scope,
            iat: now,
            exp: now + ttl_seconds,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal_error(format!("JWT encode failed: {}", e)))
    }

    fn verify(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("Rejected token: {}", e);
                None
            }
        }
    }
}

/// Raw bearer token from the `Authorization` header
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| {
                value
                    .strip_prefix("Bearer ")
                    .or_else(|| value.strip_prefix("bearer "))
            })
            .map(|token| BearerToken(token.trim().to_string()))
            .filter(|BearerToken(token)| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("Not authenticated"))
    }
}

/// The authenticated, active user behind an access token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;

        if users::find_blacklisted_token(&state.db, &token).await? {
            return Err(AppError::unauthorized(messages::NOT_VALIDATE_CREDENTIALS));
        }

        let email = state.auth.decode_access_token(&token)?;

        let user = match state.user_cache.get(&email).await {
            Some(user) => user,
            None => {
                let user = users::get_user_by_email(&state.db, &email)
                    .await?
                    .ok_or_else(|| AppError::unauthorized(messages::NOT_VALIDATE_CREDENTIALS))?;
                state.user_cache.insert(email, user.clone()).await;
                user
            }
        };

        if !user.is_active {
            return Err(AppError::forbidden(messages::USER_NOT_ACTIVE));
        }

        Ok(CurrentUser(user))
    }
}
