// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use reward_runtime::config::Config;
use reward_runtime::models::{IntegrationRecord, ProviderKind};
use reward_runtime::routes::create_router;
use reward_runtime::services::TokenCipher;
use reward_runtime::AppState;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Athlete id the mock provider hands out on code exchange.
#[allow(dead_code)]
pub const MOCK_ATHLETE_ID: u64 = 42;

/// Access token the mock provider rejects with 401.
#[allow(dead_code)]
pub const REVOKED_TOKEN: &str = "revoked-token";

/// Create a test app backed by the in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::in_memory(config).expect("Failed to build app state"));
    (create_router(state.clone()), state)
}

/// Serve `router` on an ephemeral local port; returns its base URL.
#[allow(dead_code)]
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{}", addr)
}

/// Test config whose Strava endpoints point at a mock server at `base`.
#[allow(dead_code)]
pub fn config_for_mock(base: &str) -> Config {
    let mut config = Config::test_default();
    if let Some(strava) = config.providers.get_mut("strava") {
        strava.oauth_url = format!("{}/oauth", base);
        strava.api_url = format!("{}/api", base);
        strava.subscribe_url = format!("{}/api/push_subscriptions", base);
    }
    config
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string()
}

fn expires_in_six_hours() -> i64 {
    chrono::Utc::now().timestamp() + 6 * 60 * 60
}

async fn mock_token(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") if form.get("code").map(String::as_str) == Some("good-code") => (
            StatusCode::OK,
            Json(json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_at": expires_in_six_hours(),
                "athlete": {"id": MOCK_ATHLETE_ID, "firstname": "Test"},
            })),
        ),
        Some("refresh_token") if form.get("refresh_token").map(String::as_str) == Some(REVOKED_TOKEN) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Bad Request", "errors": [{"field": "refresh_token", "code": "invalid"}]})),
        ),
        Some("refresh_token") => (
            StatusCode::OK,
            Json(json!({
                "access_token": "access-2",
                "refresh_token": "refresh-2",
                "expires_at": expires_in_six_hours(),
            })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Bad Request"})),
        ),
    }
}

async fn mock_athlete(headers: HeaderMap) -> impl IntoResponse {
    if bearer(&headers) == REVOKED_TOKEN {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Authorization Error"})),
        );
    }
    (StatusCode::OK, Json(json!({"id": MOCK_ATHLETE_ID})))
}

async fn mock_activity(Path(id): Path<u64>, headers: HeaderMap) -> impl IntoResponse {
    if bearer(&headers).is_empty() {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "id": id,
            "name": "Morning Ride",
            "sport_type": "Ride",
            "start_date": "2026-05-01T07:00:00Z",
            "distance": 25_000.5,
            "kudos_count": 3,
        })),
    )
}

/// Router standing in for the Strava OAuth and REST endpoints.
#[allow(dead_code)]
pub fn mock_strava() -> Router {
    Router::new()
        .route("/oauth/authorize", get(|| async { "Authorize Reward Runtime" }))
        .route("/oauth/token", post(mock_token))
        .route("/oauth/deauthorize", post(|| async { Json(json!({})) }))
        .route("/api/athlete", get(mock_athlete))
        .route("/api/activities/{id}", get(mock_activity))
        .route("/api/ping", get(|| async { "pong" }))
        .route(
            "/api/fail",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/api/push_subscriptions",
            get(|| async { Json(json!([{"id": 7, "callback_url": "http://localhost:8080/webhook/strava"}])) })
                .post(|| async { Json(json!({"id": 8})) }),
        )
}

/// Router standing in for the payout service; counts requests received.
#[allow(dead_code)]
pub fn mock_payout(status: StatusCode, hits: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/payouts",
            post(
                |State((status, hits)): State<(StatusCode, Arc<AtomicUsize>)>,
                 Json(_body): Json<serde_json::Value>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (status, Json(json!({"ok": status.is_success()})))
                },
            ),
        )
        .with_state((status, hits))
}

/// Store a Strava integration for `address` with the given plaintext tokens.
#[allow(dead_code)]
pub async fn store_integration(
    state: &AppState,
    address: &str,
    remote_id: &str,
    access_token: &str,
    expires_at: i64,
) -> IntegrationRecord {
    let cipher = TokenCipher::new(state.config.token_encryption_key.as_bytes()).unwrap();
    let (access, refresh) = cipher
        .encrypt_tokens(access_token, "refresh-0", address)
        .unwrap();
    let record = IntegrationRecord {
        provider: ProviderKind::Strava,
        account_address: address.to_string(),
        remote_id: remote_id.to_string(),
        access_token_encrypted: access,
        refresh_token_encrypted: refresh,
        expires_at,
        scopes: vec!["read".to_string()],
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    };
    state.db.set_integration(&record).await.unwrap();
    record
}

/// Poll `check` until it returns true (spawned webhook work is asynchronous).
#[allow(dead_code)]
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
