// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token refresh and disconnect tests against a mock provider.

mod common;

use reward_runtime::config::Config;
use reward_runtime::models::ProviderKind;
use reward_runtime::scheduler::{TokenRefreshJob, TokenRefreshSummary};
use reward_runtime::time_utils::{now_millis, SECONDS_THRESHOLD};
use reward_runtime::AppState;
use std::sync::Arc;

const HOUR_MS: i64 = 60 * 60 * 1000;

async fn mock_state() -> Arc<AppState> {
    let base = common::spawn_server(common::mock_strava()).await;
    let (_, state) = common::create_test_app_with(common::config_for_mock(&base));
    state
}

#[tokio::test]
async fn test_refresh_job_refreshes_only_expiring_tokens() {
    let state = mock_state().await;

    let expiring =
        common::store_integration(&state, "0xabc", "42", "access-1", now_millis() + 1000).await;
    let fresh =
        common::store_integration(&state, "0xdef", "43", "access-1", now_millis() + 6 * HOUR_MS)
            .await;

    let summary = TokenRefreshJob::new(state.clone()).run().await.unwrap();
    assert_eq!(
        summary,
        TokenRefreshSummary {
            refreshed: 1,
            failed: 0
        }
    );

    let stored = state
        .db
        .get_integration(ProviderKind::Strava, "0xabc")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.expires_at > SECONDS_THRESHOLD);
    assert!(stored.expires_at > now_millis() + HOUR_MS);
    assert_ne!(stored.access_token_encrypted, expiring.access_token_encrypted);
    assert_ne!(stored.refresh_token_encrypted, expiring.refresh_token_encrypted);
    assert_eq!(
        state.integrations.valid_access_token(&stored).await.unwrap(),
        "access-2"
    );

    let untouched = state
        .db
        .get_integration(ProviderKind::Strava, "0xdef")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched, fresh);
}

#[tokio::test]
async fn test_refresh_job_skips_disabled_provider() {
    let mut config = Config::test_default();
    if let Some(strava) = config.providers.get_mut("strava") {
        strava.enabled = false;
    }
    let state = Arc::new(AppState::in_memory(config).unwrap());

    let record = common::store_integration(&state, "0xabc", "42", "access-1", now_millis()).await;

    let summary = TokenRefreshJob::new(state.clone()).run().await.unwrap();
    assert_eq!(summary, TokenRefreshSummary::default());

    let stored = state
        .db
        .get_integration(ProviderKind::Strava, "0xabc")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn test_disconnect_with_expired_token_stays_deleted() {
    let state = mock_state().await;

    common::store_integration(&state, "0xabc", "42", "access-1", now_millis() - 1000).await;

    assert!(state
        .integrations
        .disconnect(ProviderKind::Strava, "0xabc")
        .await
        .unwrap());
    assert!(state
        .db
        .get_integration(ProviderKind::Strava, "0xabc")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_only_assembled_providers_are_registered() {
    let state = AppState::with_providers(
        Config::test_default(),
        reward_runtime::db::FirestoreDb::new_memory(),
        &[],
    )
    .unwrap();
    assert!(state.integrations.drivers().is_empty());
    assert!(state.integrations.drivers().get(ProviderKind::Strava).is_err());
}

#[tokio::test]
async fn test_deauthorization_confirmed_by_rejected_refresh() {
    let state = mock_state().await;

    let cipher =
        reward_runtime::services::TokenCipher::new(state.config.token_encryption_key.as_bytes())
            .unwrap();
    let (access, refresh) = cipher
        .encrypt_tokens("access-1", common::REVOKED_TOKEN, "0xabc")
        .unwrap();
    let mut record =
        common::store_integration(&state, "0xabc", "42", "access-1", now_millis() - 1000).await;
    record.access_token_encrypted = access;
    record.refresh_token_encrypted = refresh;
    state.db.set_integration(&record).await.unwrap();

    assert!(state
        .integrations
        .handle_deauthorization(ProviderKind::Strava, "42")
        .await
        .unwrap());
    assert!(state
        .db
        .get_integration(ProviderKind::Strava, "0xabc")
        .await
        .unwrap()
        .is_none());
}
