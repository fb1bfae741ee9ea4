// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payout queue job tests against a local payout service.

mod common;

use axum::http::StatusCode;
use reward_runtime::config::Config;
use reward_runtime::models::{Activity, PayoutState, ProviderKind};
use reward_runtime::scheduler::{PayoutQueueJob, PayoutRunSummary};
use reward_runtime::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn activity(remote_id: &str, created_at: &str) -> Activity {
    Activity {
        provider: ProviderKind::Strava,
        remote_id: remote_id.to_string(),
        account_address: "0xabc".to_string(),
        name: "Run".to_string(),
        sport_type: "Run".to_string(),
        start_date: "2026-05-01T07:00:00Z".to_string(),
        distance_meters: 5000.0,
        payout_state: PayoutState::NotStarted,
        queue_position: None,
        payout_error: None,
        created_at: created_at.to_string(),
        updated_at: created_at.to_string(),
    }
}

async fn state_with_payout(status: StatusCode, hits: Arc<AtomicUsize>) -> Arc<AppState> {
    let base = common::spawn_server(common::mock_payout(status, hits)).await;
    let mut config = Config::test_default();
    config.remote_services.insert("payout".to_string(), base);
    Arc::new(AppState::in_memory(config).unwrap())
}

#[tokio::test]
async fn test_payouts_processed_in_queue_order() {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = state_with_payout(StatusCode::OK, hits.clone()).await;

    state
        .db
        .set_activity(&activity("2", "2026-05-01T08:00:00Z"))
        .await
        .unwrap();
    state
        .db
        .set_activity(&activity("1", "2026-05-01T07:00:00Z"))
        .await
        .unwrap();

    let summary = PayoutQueueJob::new(state.clone()).run().await.unwrap();
    assert_eq!(
        summary,
        PayoutRunSummary {
            queued: 2,
            paid: 2,
            failed: 0
        }
    );
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let first = state
        .db
        .get_activity(ProviderKind::Strava, "1")
        .await
        .unwrap()
        .unwrap();
    let second = state
        .db
        .get_activity(ProviderKind::Strava, "2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.payout_state, PayoutState::Done);
    assert_eq!(second.payout_state, PayoutState::Done);
    assert_eq!(first.queue_position, Some(1));
    assert_eq!(second.queue_position, Some(2));
}

#[tokio::test]
async fn test_failed_payout_records_error() {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = state_with_payout(StatusCode::INTERNAL_SERVER_ERROR, hits.clone()).await;

    state
        .db
        .set_activity(&activity("1", "2026-05-01T07:00:00Z"))
        .await
        .unwrap();

    let summary = PayoutQueueJob::new(state.clone()).run().await.unwrap();
    assert_eq!(summary.failed, 1);

    let stored = state
        .db
        .get_activity(ProviderKind::Strava, "1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.payout_state, PayoutState::Failed);
    assert!(stored.payout_error.unwrap().contains("500"));

    // Failed payouts are terminal until explicitly retried.
    let summary = PayoutQueueJob::new(state.clone()).run().await.unwrap();
    assert_eq!(summary, PayoutRunSummary::default());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_batch_size_limits_payouts_per_pass() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = common::spawn_server(common::mock_payout(StatusCode::OK, hits.clone())).await;
    let mut config = Config::test_default();
    config.remote_services.insert("payout".to_string(), base);
    config.scheduler.payout_batch_size = 1;
    let state = Arc::new(AppState::in_memory(config).unwrap());

    for (id, at) in [("1", "2026-05-01T07:00:00Z"), ("2", "2026-05-01T08:00:00Z")] {
        state.db.set_activity(&activity(id, at)).await.unwrap();
    }

    let job = PayoutQueueJob::new(state.clone());
    let first = job.run().await.unwrap();
    assert_eq!((first.queued, first.paid), (2, 1));

    let second = job.run().await.unwrap();
    assert_eq!((second.queued, second.paid), (0, 1));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_new_activities_continue_queue_numbering() {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = state_with_payout(StatusCode::OK, hits).await;
    let job = PayoutQueueJob::new(state.clone());

    state
        .db
        .set_activity(&activity("1", "2026-05-01T07:00:00Z"))
        .await
        .unwrap();
    job.run().await.unwrap();

    state
        .db
        .set_activity(&activity("2", "2026-05-02T07:00:00Z"))
        .await
        .unwrap();
    job.run().await.unwrap();

    let second = state
        .db
        .get_activity(ProviderKind::Strava, "2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.queue_position, Some(2));
}
