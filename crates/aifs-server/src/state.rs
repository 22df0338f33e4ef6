use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;

use aifs_auth::{Authorizer, CapabilityToken, Method};
use aifs_engine::{AifsEngine, Mode};

use crate::error::{ServerError, ServerResult};

/// Shared state behind every handler.
pub struct AppState {
    pub engine: Arc<AifsEngine>,
    pub auth: Authorizer,
    pub mode: Mode,
}

/// Handlers receive the state as an `Arc` via axum's `State` extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(engine: Arc<AifsEngine>, auth: Authorizer, mode: Mode) -> Self {
        Self { engine, auth, mode }
    }

    /// Authorize a request: extract the bearer token from the
    /// `authorization` header and verify it for `method` in `namespace`.
    pub fn authorize(
        &self,
        headers: &HeaderMap,
        method: Method,
        namespace: &str,
    ) -> ServerResult<CapabilityToken> {
        let bearer = bearer_token(headers)?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Ok(self.auth.verify(bearer, method, namespace, now)?)
    }
}

fn bearer_token(headers: &HeaderMap) -> ServerResult<&str> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| {
            ServerError::Auth(aifs_auth::AuthError::Unauthenticated(
                "missing authorization header".into(),
            ))
        })?;
    let value = value.to_str().map_err(|_| {
        ServerError::Auth(aifs_auth::AuthError::Unauthenticated(
            "authorization header is not ASCII".into(),
        ))
    })?;
    value.strip_prefix("Bearer ").ok_or_else(|| {
        ServerError::Auth(aifs_auth::AuthError::Unauthenticated(
            "authorization header is not a bearer token".into(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aifs_auth::Caveat;
    use axum::http::header::AUTHORIZATION;

    fn state() -> AppState {
        AppState::new(
            Arc::new(AifsEngine::in_memory().unwrap()),
            Authorizer::new([1u8; 32], "aifs://test"),
            Mode::Development,
        )
    }

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        headers
    }

    #[test]
    fn missing_header_is_unauthenticated() {
        let state = state();
        let err = state
            .authorize(&HeaderMap::new(), Method::Get, "ns")
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::Auth(aifs_auth::AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn valid_bearer_token_passes() {
        let state = state();
        let token = state
            .auth
            .mint("client", &[Caveat::Methods(vec![Method::Get])])
            .serialize();
        assert!(state
            .authorize(&headers_with(&token), Method::Get, "ns")
            .is_ok());
    }

    #[test]
    fn method_mismatch_denied() {
        let state = state();
        let token = state
            .auth
            .mint("client", &[Caveat::Methods(vec![Method::Get])])
            .serialize();
        let err = state
            .authorize(&headers_with(&token), Method::Put, "ns")
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::Auth(aifs_auth::AuthError::PermissionDenied(_))
        ));
    }

    #[test]
    fn non_bearer_scheme_rejected() {
        let state = state();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(state.authorize(&headers, Method::Get, "ns").is_err());
    }
}
