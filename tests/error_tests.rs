// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use reward_runtime::error::AppError;

fn remote(status: Option<u16>) -> AppError {
    AppError::RemoteService {
        service: "strava".to_string(),
        status,
        message: "failed".to_string(),
    }
}

#[test]
fn test_is_remote_auth_error_matches() {
    assert!(remote(Some(401)).is_remote_auth_error());
    assert!(remote(Some(403)).is_remote_auth_error());
}

#[test]
fn test_is_remote_auth_error_no_match() {
    assert!(!remote(Some(429)).is_remote_auth_error());
    assert!(!remote(Some(500)).is_remote_auth_error());
    assert!(!remote(None).is_remote_auth_error());
    assert!(!AppError::InvalidArgument("Bad Request".to_string()).is_remote_auth_error());
}

#[test]
fn test_status_codes() {
    let cases = [
        (AppError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
        (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (remote(Some(500)), StatusCode::BAD_GATEWAY),
        (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (AppError::Runtime("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, expected) in cases {
        assert_eq!(err.into_response().status(), expected);
    }
}

#[tokio::test]
async fn test_error_body_hides_internal_details() {
    let response = AppError::Database("connection string with secrets".into()).into_response();
    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "database_error");
    assert!(json.get("details").is_none());
}
