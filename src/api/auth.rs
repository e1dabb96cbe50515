use axum::{
    extract::{FromRequestParts, Request, State},
    http::{Extensions, HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::config::AuthConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i32,
    pub exp: i64,
    pub iat: i64,
}

/// Identity attached to a request carrying a valid bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub admin: bool,
}

/// The caller's identity when one was supplied.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

pub fn issue_token(user_id: i32, config: &AuthConfig) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let lifetime = i64::try_from(config.token_lifetime_seconds).unwrap_or(i64::MAX);
    let exp = now + Duration::seconds(lifetime);

    let claims = Claims {
        sub: user_id,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
}

/// Set by [`attach_user`] when the request carried a bearer token that did not
/// resolve to a user. Public routes ignore it; the gates report it.
#[derive(Debug, Clone, Copy)]
struct RejectedToken;

enum Bearer {
    Missing,
    Rejected,
    User(AuthUser),
}

async fn identify(state: &AppState, headers: &HeaderMap) -> Result<Bearer, ApiError> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(Bearer::Missing);
    };

    let Some(token) = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
    else {
        return Ok(Bearer::Rejected);
    };

    let claims = match verify_token(token, &state.config.auth.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            return Ok(Bearer::Rejected);
        }
    };

    Ok(match state.store.users().get(claims.sub).await? {
        Some(user) => Bearer::User(AuthUser {
            id: user.id,
            username: user.username,
            admin: user.admin,
        }),
        None => {
            tracing::debug!(user_id = claims.sub, "Bearer token names an unknown user");
            Bearer::Rejected
        }
    })
}

fn anonymous(extensions: &Extensions) -> ApiError {
    if extensions.get::<RejectedToken>().is_some() {
        ApiError::unauthorized("Invalid token")
    } else {
        ApiError::unauthorized("Authentication required")
    }
}

/// Attaches [`AuthUser`] when the request carries a valid bearer token.
/// A missing, malformed, expired or unknown token leaves the request
/// anonymous, so login and the public reads keep working with a stale
/// token; `require_auth` and `require_admin` answer 401 "Invalid token" for it.
pub async fn attach_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match identify(&state, request.headers()).await? {
        Bearer::Missing => {}
        Bearer::Rejected => {
            request.extensions_mut().insert(RejectedToken);
        }
        Bearer::User(user) => {
            tracing::Span::current().record("user_id", user.id);
            request.extensions_mut().insert(user);
        }
    }

    Ok(next.run(request).await)
}

pub async fn require_auth(request: Request, next: Next) -> Result<Response, ApiError> {
    if request.extensions().get::<AuthUser>().is_none() {
        return Err(anonymous(request.extensions()));
    }

    Ok(next.run(request).await)
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<AuthUser>().map(|user| user.admin) {
        None => Err(anonymous(request.extensions())),
        Some(false) => Err(ApiError::forbidden("Admin access required")),
        Some(true) => Ok(next.run(request).await),
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| anonymous(&parts.extensions))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthUser>().cloned()))
    }
}
