// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payout queue job.
//!
//! Each pass first queues every `not_started` activity, handing out
//! increasing queue positions, then pays out up to `payout_batch_size`
//! queued activities in queue order through the `payout` remote service.

use crate::error::AppError;
use crate::models::{Activity, PayoutState};
use crate::scheduler::ScheduledJob;
use crate::services::{CallOptions, HttpMethod};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Remote service receiving payout requests.
pub const PAYOUT_SERVICE: &str = "payout";

/// Path of the payout endpoint on [`PAYOUT_SERVICE`].
pub const PAYOUT_PATH: &str = "payouts";

/// Counts from one pass of the job.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PayoutRunSummary {
    pub queued: usize,
    pub paid: usize,
    pub failed: usize,
}

pub struct PayoutQueueJob {
    state: Arc<AppState>,
}

impl PayoutQueueJob {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Queue new activities and process one batch.
    pub async fn run(&self) -> Result<PayoutRunSummary, AppError> {
        let mut summary = PayoutRunSummary {
            queued: self.enqueue_new().await?,
            ..Default::default()
        };

        let batch_size = self.state.config.scheduler.payout_batch_size;
        let queued = self.state.db.activities_in_state(PayoutState::Queued).await?;

        for activity in queued.into_iter().take(batch_size) {
            if self.pay(activity).await? {
                summary.paid += 1;
            } else {
                summary.failed += 1;
            }
        }

        if summary != PayoutRunSummary::default() {
            tracing::info!(
                queued = summary.queued,
                paid = summary.paid,
                failed = summary.failed,
                "Payout pass complete"
            );
        }
        Ok(summary)
    }

    async fn enqueue_new(&self) -> Result<usize, AppError> {
        let db = &self.state.db;
        let pending = db.activities_in_state(PayoutState::NotStarted).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let mut position = db.max_queue_position().await?;
        for mut activity in pending.iter().cloned() {
            position += 1;
            activity.enqueue(position)?;
            activity.updated_at = format_utc_rfc3339(Utc::now());
            db.set_activity(&activity).await?;
            tracing::debug!(activity = %activity.id(), position, "Activity queued for payout");
        }
        Ok(pending.len())
    }

    /// Pay one queued activity; returns whether the payout succeeded.
    async fn pay(&self, mut activity: Activity) -> Result<bool, AppError> {
        let db = &self.state.db;

        activity.advance_payout(PayoutState::Processing)?;
        activity.updated_at = format_utc_rfc3339(Utc::now());
        db.set_activity(&activity).await?;

        let options = CallOptions::new()
            .param("activityId", activity.id())
            .param("address", activity.account_address.clone())
            .param("provider", activity.provider.as_str())
            .param("distanceMeters", activity.distance_meters)
            .param("queuePosition", activity.queue_position);

        let result = self
            .state
            .remote
            .call(HttpMethod::Post, PAYOUT_PATH, options, PAYOUT_SERVICE)
            .await;

        let paid = match result {
            Ok(_) => {
                activity.advance_payout(PayoutState::Done)?;
                activity.payout_error = None;
                tracing::info!(
                    activity = %activity.id(),
                    address = %activity.account_address,
                    "Payout done"
                );
                true
            }
            Err(e) => {
                tracing::warn!(activity = %activity.id(), error = %e, "Payout failed");
                activity.fail_payout(&e.to_string())?;
                false
            }
        };

        activity.updated_at = format_utc_rfc3339(Utc::now());
        db.set_activity(&activity).await?;
        Ok(paid)
    }
}

#[async_trait]
impl ScheduledJob for PayoutQueueJob {
    fn name(&self) -> &'static str {
        "payout-queue"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.state.config.scheduler.payout_interval_secs)
    }

    async fn run_once(&self) -> Result<(), AppError> {
        self.run().await.map(|_| ())
    }
}
