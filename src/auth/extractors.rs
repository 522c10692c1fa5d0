use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::error::AppError;

/// Pull the bearer token from `?token=` or, failing that, `Authorization: Bearer <token>`.
///
/// Returns an empty string when neither source carries one. A repeated
/// `token` parameter resolves to its first occurrence.
pub fn extract_token(parts: &Parts) -> String {
    if let Ok(Query(pairs)) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri) {
        if let Some((_, token)) = pairs.into_iter().find(|(key, _)| key == "token") {
            if !token.is_empty() {
                return token;
            }
        }
    }

    let Some(header) = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return String::new();
    };

    match header.split(' ').collect::<Vec<_>>().as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => token.to_string(),
        _ => String::new(),
    }
}

/// Verified caller id taken from the request's bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = Arc::<JwtKeys>::from_ref(state);
        let token = extract_token(parts);

        let user_id = keys.extract_subject(&token).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            AppError::Unauthorized(e.to_string())
        })?;

        Ok(AuthUser(user_id))
    }
}
