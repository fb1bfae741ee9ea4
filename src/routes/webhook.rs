// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook routes for provider events.

use crate::models::ProviderKind;
use crate::oauth::OAuthDriver;
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook/{provider}", get(verify).post(handle_event))
}

/// Webhook verification query params.
#[derive(Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    mode: String,
    #[serde(rename = "hub.challenge", default)]
    challenge: String,
    #[serde(rename = "hub.verify_token", default)]
    verify_token: String,
}

/// Verification response.
#[derive(Serialize, Default)]
struct VerifyResponse {
    #[serde(rename = "hub.challenge")]
    challenge: String,
}

fn driver<'a>(state: &'a AppState, provider: &str) -> Option<&'a OAuthDriver> {
    match state.integrations.drivers().resolve(provider) {
        Ok(driver) => Some(driver),
        Err(e) => {
            tracing::warn!(provider, error = %e, "Webhook for unknown provider");
            None
        }
    }
}

/// Verify webhook subscription (GET).
async fn verify(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    let Some(driver) = driver(&state, &provider) else {
        return (StatusCode::NOT_FOUND, Json(VerifyResponse::default()));
    };

    if params.mode != "subscribe" {
        tracing::warn!(mode = %params.mode, "Webhook verification failed: unexpected mode");
        return (StatusCode::FORBIDDEN, Json(VerifyResponse::default()));
    }

    match driver.validate_webhook_subscription(&params.challenge, &params.verify_token) {
        Ok(challenge) => {
            tracing::info!(provider = %provider, "Webhook subscription verified");
            (StatusCode::OK, Json(VerifyResponse { challenge }))
        }
        Err(e) => {
            tracing::warn!(provider = %provider, error = %e, "Webhook verification failed");
            (StatusCode::FORBIDDEN, Json(VerifyResponse::default()))
        }
    }
}

/// Provider webhook event payload.
#[derive(Deserialize, Debug)]
struct WebhookEvent {
    object_type: String, // "activity" or "athlete"
    object_id: u64,
    aspect_type: String, // "create", "update", "delete"
    owner_id: u64,
    #[serde(default)]
    subscription_id: Option<u64>,
    /// For athlete events, contains {"authorized": "false"} on deauthorization
    #[serde(default)]
    updates: Option<std::collections::HashMap<String, serde_json::Value>>,
}

/// Strava sends: object_type="athlete", aspect_type="update", updates={"authorized": "false"}
fn is_deauthorization(event: &WebhookEvent) -> bool {
    event
        .updates
        .as_ref()
        .and_then(|u| u.get("authorized"))
        .is_some_and(|v| v == false || v == "false")
}

/// Handle incoming webhook events (POST).
async fn handle_event(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> StatusCode {
    tracing::info!(provider = %provider, payload = %payload, "Webhook event received (raw)");

    let Some(kind) = driver(&state, &provider).map(OAuthDriver::kind) else {
        return StatusCode::NOT_FOUND;
    };

    let event: WebhookEvent = match serde_json::from_value(payload) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse webhook event");
            return StatusCode::OK; // Still return 200 to avoid provider retries
        }
    };

    tracing::info!(
        object_type = %event.object_type,
        object_id = event.object_id,
        aspect_type = %event.aspect_type,
        owner_id = event.owner_id,
        subscription_id = ?event.subscription_id,
        "Webhook event parsed successfully"
    );

    match (event.object_type.as_str(), event.aspect_type.as_str()) {
        ("activity", "create") => {
            spawn_import(state, kind, event.owner_id, event.object_id);
        }
        ("activity", "update") => {
            tracing::debug!(activity_id = event.object_id, "Activity updated");
        }
        ("activity", "delete") => {
            tracing::info!(
                activity_id = event.object_id,
                owner_id = event.owner_id,
                "Activity deleted at provider (record kept)"
            );
        }
        ("athlete", "update") if is_deauthorization(&event) => {
            spawn_deauthorization(state, kind, event.owner_id);
        }
        _ => {
            tracing::debug!(
                object_type = %event.object_type,
                aspect_type = %event.aspect_type,
                "Ignoring unhandled event type"
            );
        }
    }

    // Always return 200 OK quickly
    StatusCode::OK
}

fn spawn_import(state: Arc<AppState>, provider: ProviderKind, owner_id: u64, activity_id: u64) {
    tokio::spawn(async move {
        let owner = owner_id.to_string();
        let activity = activity_id.to_string();
        if let Err(e) = state.importer.import(provider, &owner, &activity).await {
            tracing::error!(
                error = %e,
                activity_id,
                owner_id,
                "Failed to import activity"
            );
        }
    });
}

fn spawn_deauthorization(state: Arc<AppState>, provider: ProviderKind, owner_id: u64) {
    tokio::spawn(async move {
        let owner = owner_id.to_string();
        if let Err(e) = state
            .integrations
            .handle_deauthorization(provider, &owner)
            .await
        {
            tracing::error!(error = %e, owner_id, "Failed to handle deauthorization");
        }
    });
}
