use super::middleware::*;
use super::tokens::TokenCodec;
use axum::{Extension, Json, Router, body::Body, http::Request, routing::get};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "middleware-test-secret";

fn protected_router(codec: Arc<TokenCodec>) -> Router {
    async fn handler(client: AuthenticatedClient) -> Json<serde_json::Value> {
        Json(serde_json::json!({"client_id": client.client_id, "scope": client.scope}))
    }

    Router::new()
        .route("/protected", get(handler))
        .layer(Extension(BearerAuthState { codec }))
}

#[tokio::test]
async fn test_valid_bearer_token_accepted() {
    let codec = Arc::new(TokenCodec::new(SECRET));
    let token = codec.mint("client-42", 60, "all").unwrap();
    let router = protected_router(codec);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/protected")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["client_id"], "client-42");
    assert_eq!(body["scope"], "all");
}

#[tokio::test]
async fn test_missing_and_malformed_headers_rejected() {
    let codec = Arc::new(TokenCodec::new(SECRET));
    let token = codec.mint("client-42", 60, "all").unwrap();
    let router = protected_router(codec);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/protected")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Wrong scheme
    let response = router
        .oneshot(
            Request::builder()
                .uri("/protected")
                .header("authorization", format!("Basic {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let codec = Arc::new(TokenCodec::new(SECRET));
    let forged = TokenCodec::new("other-secret")
        .mint("client-42", 60, "all")
        .unwrap();
    let router = protected_router(codec);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/protected")
                .header("authorization", format!("Bearer {}", forged))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_validate_token_helper() {
    let codec = TokenCodec::new(SECRET);
    let token = codec.mint("client-42", 60, "quotes").unwrap();

    let client = validate_token(&codec, &token).unwrap();
    assert_eq!(client.client_id, "client-42");
    assert_eq!(client.scope, "quotes");

    assert!(validate_token(&codec, "garbage").is_err());
}
