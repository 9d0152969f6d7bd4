//! Bearer-token identity.
//!
//! Tokens are issued by the external identity provider and signed with a
//! shared HS256 secret. The administrator is whoever carries `ADMIN_EMAIL`.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::User;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub is_admin: bool,
}

impl AuthUser {
    pub fn to_user(&self) -> User {
        User::new(self.id.clone(), self.email.clone())
    }
}

pub fn issue_token(secret: &str, user_id: &str, email: &str, ttl: chrono::Duration) -> Result<String> {
    let claims = Claims { sub: user_id.to_string(), email: Some(email.to_string()), exp: (Utc::now() + ttl).timestamp() };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::new(Algorithm::HS256))
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::Unauthorized
        })
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthUser> {
    let token = bearer(parts).ok_or(AppError::Unauthorized)?;
    let claims = verify_token(&state.config.auth_jwt_secret, token)?;
    let email = claims.email.filter(|e| !e.trim().is_empty()).ok_or(AppError::Unauthorized)?;
    Ok(AuthUser { is_admin: state.config.is_admin_email(&email), id: claims.sub, email })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        authenticate(parts, state)
    }
}

/// Any signed-in user, or none.
pub struct MaybeUser(pub Option<AuthUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        Ok(MaybeUser(authenticate(parts, state).ok()))
    }
}

/// The administrator account.
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = authenticate(parts, state)?;
        if !user.is_admin {
            return Err(AppError::Unauthorized);
        }
        Ok(AdminUser(user))
    }
}

/// A signed-in shopper; the administrator is turned away.
pub struct CustomerUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for CustomerUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = authenticate(parts, state)?;
        if user.is_admin {
            return Err(AppError::Unauthorized);
        }
        Ok(CustomerUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let token = issue_token("secret", "user_1", "a@b.c", chrono::Duration::minutes(5)).unwrap();
        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "user_1");
        assert_eq!(claims.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn test_rejects_wrong_secret_and_expired() {
        let token = issue_token("secret", "user_1", "a@b.c", chrono::Duration::minutes(5)).unwrap();
        assert!(matches!(verify_token("other", &token), Err(AppError::Unauthorized)));

        let expired = issue_token("secret", "user_1", "a@b.c", chrono::Duration::hours(-1)).unwrap();
        assert!(matches!(verify_token("secret", &expired), Err(AppError::Unauthorized)));
    }
}
