// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote HTTP client tests against a local server.

mod common;

use reward_runtime::error::AppError;
use reward_runtime::services::{CallOptions, HttpMethod, RemoteServices};

async fn services() -> RemoteServices {
    let base = common::spawn_server(common::mock_strava()).await;
    let config = common::config_for_mock(&base);
    RemoteServices::from_config(&config, &reqwest::Client::new())
}

#[tokio::test]
async fn test_get_ping_resolves_with_body() {
    let remote = services().await;

    let response = remote
        .call(HttpMethod::Get, "ping", CallOptions::new(), "strava")
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "pong");
}

#[tokio::test]
async fn test_server_error_rejects_with_remote_service_error() {
    let remote = services().await;

    let err = remote
        .call(HttpMethod::Get, "fail", CallOptions::new(), "strava")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::RemoteService {
            status: Some(500),
            ..
        }
    ));
}

#[tokio::test]
async fn test_unknown_service_is_invalid_argument() {
    let remote = services().await;

    let err = remote
        .call(HttpMethod::Get, "ping", CallOptions::new(), "nope")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_transport_failure_has_no_status() {
    let mut config = common::config_for_mock("http://127.0.0.1:1");
    config
        .remote_services
        .insert("payout".to_string(), "http://127.0.0.1:1".to_string());
    let remote = RemoteServices::from_config(&config, &reqwest::Client::new());

    let err = remote
        .call(HttpMethod::Post, "payouts", CallOptions::new(), "payout")
        .await
        .unwrap_err();

    assert_eq!(err.remote_status(), None);
    assert!(matches!(err, AppError::RemoteService { .. }));
}

#[test]
fn test_unsupported_verb_is_invalid_argument() {
    assert!(matches!(
        "DELETE".parse::<HttpMethod>(),
        Err(AppError::InvalidArgument(_))
    ));
}
