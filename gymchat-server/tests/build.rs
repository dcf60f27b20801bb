use axum::body::Body;
use axum::http::Request;
use gymchat_core::ConfigStore;
use gymchat_server::{build_with, configure_defaults};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

fn base_config() -> ConfigStore {
    let mut store = ConfigStore::new();
    configure_defaults(&mut store);
    store.set("provider.api_key", "pk_test");
    store.set("provider.api_secret", "provider-secret");
    store.set("session.secret", "session-secret");
    store.set(
        "memberships.file",
        concat!(env!("CARGO_MANIFEST_DIR"), "/data/memberships.json"),
    );
    store
}

fn session(sub: &str) -> String {
    encode(
        &Header::default(),
        &json!({
            "sub": sub,
            "iss": "gymchat-auth",
            "aud": ["gymchat-api"],
            "exp": chrono::Utc::now().timestamp() + 600,
        }),
        &EncodingKey::from_secret(b"session-secret"),
    )
    .unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn missing_provider_secret_fails_at_startup() {
    let mut store = ConfigStore::new();
    configure_defaults(&mut store);
    store.set("provider.api_key", "pk_test");
    store.set("session.secret", "session-secret");
    assert!(build_with(store.snapshot()).is_err());
}

#[test]
fn missing_membership_file_fails_at_startup() {
    let mut store = base_config();
    store.set("memberships.file", "/nonexistent/memberships.json");
    assert!(build_with(store.snapshot()).is_err());
}

#[test]
fn default_address_comes_from_http_settings() {
    let app = build_with(base_config().snapshot()).unwrap();
    assert_eq!(app.addr(), "127.0.0.1:3000");
}

#[tokio::test]
async fn seeded_member_gets_a_gym_scoped_token() {
    let app = build_with(base_config().snapshot()).unwrap();

    let res = app
        .ax
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat/token")
                .header("authorization", format!("Bearer {}", session("456")))
                .header("x-gym-id", "123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["api_key"], "pk_test");
    assert_eq!(body["internal_user_id"], 456);
    assert!(body["token"].as_str().is_some_and(|t| t.split('.').count() == 3));
}

#[tokio::test]
async fn suspended_seed_is_forbidden() {
    let app = build_with(base_config().snapshot()).unwrap();

    let res = app
        .ax
        .router()
        .oneshot(
            Request::builder()
                .uri("/chat/token")
                .header("authorization", format!("Bearer {}", session("30")))
                .header("x-gym-id", "5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 403);
}

#[tokio::test]
async fn webhook_fails_closed_without_a_secret() {
    let app = build_with(base_config().snapshot()).unwrap();

    let res = app
        .ax
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat/webhook")
                .header("x-signature", "00")
                .body(Body::from(r#"{"type":"channel.created"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 500);
}
