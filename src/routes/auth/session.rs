use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use tracing::debug;

use crate::routes::auth::claims::Claims;
use crate::utils::jwt::{decode_jwt, JwtKeyProvider};

pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Session resolved from `X-Auth-Token` or an `Authorization: Bearer` header.
#[derive(Debug, PartialEq)]
pub struct AuthSession(pub Claims);

impl AuthSession {
    pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
        if let Some(value) = headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
        {
            return Some(value.to_string());
        }
        headers
            .typed_get::<Authorization<Bearer>>()
            .map(|auth| auth.token().to_string())
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: JwtKeyProvider + Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = Self::token_from_headers(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = decode_jwt(&token, state.jwt_keys()).map_err(|err| {
            debug!(error = %err, "rejected session token");
            StatusCode::UNAUTHORIZED
        })?;

        Ok(AuthSession(claims.claims))
    }
}
