use axum::{
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::*;

use super::{error::ApiError, AppState};

const TOKEN_LIFETIME_HOURS: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(email: &str, jwt_secret: &str) -> Result<String, ApiError> {
    let now = chrono::Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + chrono::Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp() as usize;
    let claims = TokenClaims {
        sub: email.to_owned(),
        exp,
        iat,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.to_string()))
}

pub fn decode_token(token: &str, jwt_secret: &str) -> Result<TokenClaims, ApiError> {
    jsonwebtoken::decode::<TokenClaims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("jwt:invalid {:?}", e);
        ApiError::NotAuthenticated
    })
}

/// Requires `Authorization: Bearer <token>` and makes the claims available
/// to handlers as an extension.
pub async fn auth<B>(
    State(state): State<Arc<AppState>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Result<impl IntoResponse, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::NotAuthenticated)?;

    let claims = decode_token(token, &state.env.jwt_secret)?;

    trace!(sub = %claims.sub, "jwt:ok");

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
