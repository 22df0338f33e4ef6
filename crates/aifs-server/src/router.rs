use axum::routing::{get, post, put};
use axum::Router;

use crate::handler;
use crate::state::SharedState;

/// Build the axum router with every AIFS endpoint.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/v1/assets", post(handler::put_asset).get(handler::list_assets))
        .route(
            "/v1/assets/:id",
            get(handler::get_asset).delete(handler::delete_asset),
        )
        .route("/v1/search", post(handler::search))
        .route("/v1/snapshots", post(handler::create_snapshot))
        .route("/v1/snapshots/:id", get(handler::get_snapshot))
        .route("/v1/snapshots/:id/verify", post(handler::verify_snapshot))
        .route(
            "/v1/snapshots/:id/proof/:asset_id",
            get(handler::snapshot_proof),
        )
        .route("/v1/branches/:ns", get(handler::list_branches))
        .route(
            "/v1/branches/:ns/:name",
            put(handler::put_branch)
                .get(handler::get_branch)
                .delete(handler::delete_branch),
        )
        .route("/v1/branches/:ns/:name/history", get(handler::branch_history))
        .route("/v1/tags/:ns", get(handler::list_tags))
        .route(
            "/v1/tags/:ns/:name",
            put(handler::put_tag).get(handler::get_tag),
        )
        .route("/v1/namespaces", get(handler::list_namespaces))
        .route("/v1/keys/namespace", post(handler::register_namespace_key))
        .route("/v1/keys/trusted", post(handler::pin_trusted_key))
        .route("/v1/events", get(handler::events))
        .route("/v1/health", get(handler::health))
        .route("/v1/introspect", get(handler::introspect))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode as HttpStatus};
    use tower::util::ServiceExt;

    use aifs_auth::{Authorizer, Caveat, Method};
    use aifs_engine::{AifsEngine, Mode};
    use aifs_protocol::{AifsCodec, AifsMessage, PutAssetResponse};
    use aifs_types::AssetKind;

    use crate::state::AppState;

    fn test_state(mode: Mode) -> SharedState {
        Arc::new(AppState::new(
            Arc::new(AifsEngine::in_memory().unwrap()),
            Authorizer::new([9u8; 32], "aifs://test"),
            mode,
        ))
    }

    fn token(state: &SharedState, caveats: &[Caveat]) -> String {
        format!("Bearer {}", state.auth.mint("test-client", caveats).serialize())
    }

    fn put_body(namespace: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(
            AifsCodec::encode(&AifsMessage::PutBegin {
                namespace: namespace.into(),
                kind: AssetKind::Blob,
                metadata: Default::default(),
                parents: vec![],
                embedding: None,
                tx_id: None,
            })
            .unwrap(),
        );
        body.extend(AifsCodec::encode(&AifsMessage::PutChunk { data: data.to_vec() }).unwrap());
        body.extend(AifsCodec::encode(&AifsMessage::PutEnd).unwrap());
        body
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let app = build_router(test_state(Mode::Production));
        let response = app
            .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatus::OK);
    }

    #[tokio::test]
    async fn assets_require_token() {
        let app = build_router(test_state(Mode::Production));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/assets?namespace=ns")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatus::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn put_then_get_roundtrip() {
        let state = test_state(Mode::Production);
        let bearer = token(&state, &[]);
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/assets")
                    .header(header::AUTHORIZATION, &bearer)
                    .body(Body::from(put_body("ns", b"hello over http")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatus::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let put: PutAssetResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(put.asset_id, blake3::hash(b"hello over http").to_hex().to_string());

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!(
                        "/v1/assets/{}?namespace=ns&include_data=true",
                        put.asset_id
                    ))
                    .header(header::AUTHORIZATION, &bearer)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatus::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hello over http");
    }

    #[tokio::test]
    async fn method_caveat_enforced() {
        let state = test_state(Mode::Production);
        let read_only = token(&state, &[Caveat::Methods(vec![Method::Get])]);
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/assets")
                    .header(header::AUTHORIZATION, &read_only)
                    .body(Body::from(put_body("ns", b"nope")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatus::FORBIDDEN);
    }

    #[tokio::test]
    async fn namespace_caveat_enforced() {
        let state = test_state(Mode::Production);
        let ns1_only = token(&state, &[Caveat::Namespace("ns1".into())]);
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/assets")
                    .header(header::AUTHORIZATION, &ns1_only)
                    .body(Body::from(put_body("ns2", b"cross namespace")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatus::FORBIDDEN);
    }

    #[tokio::test]
    async fn expired_token_is_401() {
        let state = test_state(Mode::Production);
        let expired = token(&state, &[Caveat::Expires(1)]);
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/assets?namespace=ns")
                    .header(header::AUTHORIZATION, &expired)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatus::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn introspect_disabled_in_production() {
        let state = test_state(Mode::Production);
        let bearer = token(&state, &[]);
        let app = build_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/introspect")
                    .header(header::AUTHORIZATION, &bearer)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatus::FORBIDDEN);
    }

    #[tokio::test]
    async fn introspect_available_in_development() {
        let state = test_state(Mode::Development);
        let bearer = token(&state, &[]);
        let app = build_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/introspect")
                    .header(header::AUTHORIZATION, &bearer)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatus::OK);
    }

    #[tokio::test]
    async fn malformed_put_stream_is_400() {
        let state = test_state(Mode::Production);
        let bearer = token(&state, &[]);
        let app = build_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/assets")
                    .header(header::AUTHORIZATION, &bearer)
                    .body(Body::from(vec![1u8, 2, 3]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatus::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_asset_is_404() {
        let state = test_state(Mode::Production);
        let bearer = token(&state, &[]);
        let app = build_router(state);
        let missing = blake3::hash(b"never stored").to_hex().to_string();
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/assets/{missing}?namespace=ns"))
                    .header(header::AUTHORIZATION, &bearer)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatus::NOT_FOUND);
    }
}
