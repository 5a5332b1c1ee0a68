//! Bearer-token extractor for the live channel upgrade request.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use pumpwatch_core::error::CoreError;
use serde::Deserialize;

use crate::auth::jwt::validate_token;
use crate::auth::users::LiveUser;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Pull the access token from `?token=` or an `Authorization: Bearer` header.
///
/// Browsers cannot set headers on a WebSocket handshake, so the query
/// parameter takes precedence.
fn bearer_token(parts: &Parts) -> Option<String> {
    let from_query = Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty());
    if from_query.is_some() {
        return from_query;
    }

    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

impl FromRequestParts<AppState> for LiveUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| unauthorized("No authentication token provided"))?;

        let claims = validate_token(&token, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        match state.users.find_active(claims.sub).await? {
            Some(user) => Ok(user),
            None => {
                tracing::warn!(user_id = claims.sub, "Live connection for unknown or inactive user");
                Err(unauthorized("Invalid user"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(uri: &str, header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn token_from_query() {
        assert_eq!(bearer_token(&parts("/ws?token=abc", None)).as_deref(), Some("abc"));
    }

    #[test]
    fn token_from_bearer_header() {
        let p = parts("/ws", Some("Bearer xyz"));
        assert_eq!(bearer_token(&p).as_deref(), Some("xyz"));
    }

    #[test]
    fn query_wins_over_header() {
        let p = parts("/ws?token=from-query", Some("Bearer from-header"));
        assert_eq!(bearer_token(&p).as_deref(), Some("from-query"));
    }

    #[test]
    fn missing_or_malformed_token() {
        assert_eq!(bearer_token(&parts("/ws", None)), None);
        assert_eq!(bearer_token(&parts("/ws?token=", None)), None);
        assert_eq!(bearer_token(&parts("/ws", Some("Basic dXNlcg=="))), None);
    }
}
