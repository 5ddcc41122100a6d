//! API token authentication extractors.
//!
//! When `server.api_token` is configured, requests must present it via:
//! - `Authorization: Bearer <token>` header
//! - `X-API-Key: <token>` header
//! - `?token=<token>` (streaming endpoints only, since browsers cannot set
//!   headers on WebSocket or EventSource requests)
//!
//! Tokens are compared by SHA-256 digest. Without a configured token every
//! request is accepted.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use atelier_infra::crypto::hash::digest_eq;

use crate::http::error::AppError;
use crate::state::AppState;

/// Authenticated request marker for JSON endpoints.
pub struct Authenticated;

/// Authenticated request marker for WebSocket and SSE endpoints.
pub struct StreamAuthenticated;

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        verify(parts, state.config.server.api_token.as_deref(), false)?;
        Ok(Authenticated)
    }
}

impl FromRequestParts<AppState> for StreamAuthenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        verify(parts, state.config.server.api_token.as_deref(), true)?;
        Ok(StreamAuthenticated)
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn verify(parts: &Parts, expected: Option<&str>, allow_query: bool) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let provided = extract_token(parts, allow_query)?;
    if digest_eq(&provided, expected) {
        Ok(())
    } else {
        tracing::warn!(path = %parts.uri.path(), "rejected request with invalid API token");
        Err(AppError::Unauthorized("Invalid API token.".to_string()))
    }
}

/// Extract the token from headers, then (if allowed) the query string.
fn extract_token(parts: &Parts, allow_query: bool) -> Result<String, AppError> {
    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    if let Some(key) = parts.headers.get("x-api-key") {
        let key_str = key
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid X-API-Key header encoding".to_string()))?;
        return Ok(key_str.trim().to_string());
    }

    if allow_query {
        if let Ok(Query(TokenQuery { token: Some(token) })) = Query::try_from_uri(&parts.uri) {
            return Ok(token);
        }
    }

    Err(AppError::Unauthorized(
        "Missing API token. Provide it via 'Authorization: Bearer <token>' or 'X-API-Key: <token>' header.".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_open_when_no_token_configured() {
        assert!(verify(&parts("/api/v1/projects", &[]), None, false).is_ok());
    }

    #[test]
    fn test_bearer_and_api_key_headers() {
        let bearer = parts("/api/v1/projects", &[("authorization", "Bearer s3cret")]);
        assert!(verify(&bearer, Some("s3cret"), false).is_ok());

        let api_key = parts("/api/v1/projects", &[("x-api-key", "s3cret")]);
        assert!(verify(&api_key, Some("s3cret"), false).is_ok());

        let wrong = parts("/api/v1/projects", &[("x-api-key", "nope")]);
        assert!(matches!(
            verify(&wrong, Some("s3cret"), false),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_query_token_only_for_streams() {
        let req = parts("/ws/events?token=s3cret", &[]);
        assert!(verify(&req, Some("s3cret"), true).is_ok());
        assert!(verify(&req, Some("s3cret"), false).is_err());
    }

    #[test]
    fn test_missing_token_rejected() {
        let req = parts("/api/v1/projects", &[]);
        assert!(matches!(
            verify(&req, Some("s3cret"), true),
            Err(AppError::Unauthorized(_))
        ));
    }
}
