//! Request extractors.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::http::error::ApiError;
use crate::http::server::AppState;

/// Id of the user whose token accompanied the request.
///
/// Accepts `Authorization: Bearer <jwt>` as well as a bare `<jwt>`, which is
/// what `/user/register` and `/user/auth` hand out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;

        let token = bearer_token(raw);
        let uid = state.tokens.verify(token)?;
        Ok(AuthUser(uid))
    }
}

fn bearer_token(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => raw,
    }
}
