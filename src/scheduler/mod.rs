// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background scheduler for the assembled job modules.
//!
//! Each job runs on its own `tokio::time::interval` loop. A tick is a
//! single pass; failures are logged and the loop waits for the next tick.

pub mod payout_queue;
pub mod token_refresh;

use crate::error::AppError;
use crate::modules::SchedulerJobKind;
use crate::AppState;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub use payout_queue::{PayoutQueueJob, PayoutRunSummary};
pub use token_refresh::{TokenRefreshJob, TokenRefreshSummary};

/// Floor for job intervals; a zero period would panic the job's task.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// A periodic job driven by the scheduler.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// Run one pass of the job.
    async fn run_once(&self) -> Result<(), AppError>;
}

/// Jobs instantiated from the assembled scheduler modules.
pub struct Scheduler {
    jobs: Vec<Arc<dyn ScheduledJob>>,
}

impl Scheduler {
    pub fn from_modules(modules: &[SchedulerJobKind], state: Arc<AppState>) -> Self {
        let jobs = modules
            .iter()
            .map(|kind| -> Arc<dyn ScheduledJob> {
                match kind {
                    SchedulerJobKind::PayoutQueue => {
                        Arc::new(PayoutQueueJob::new(Arc::clone(&state)))
                    }
                    SchedulerJobKind::TokenRefresh => {
                        Arc::new(TokenRefreshJob::new(Arc::clone(&state)))
                    }
                }
            })
            .collect();
        Self { jobs }
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|j| j.name()).collect()
    }

    /// Spawn one loop per job.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        self.jobs
            .into_iter()
            .map(|job| {
                tracing::info!(
                    job = job.name(),
                    interval_secs = job.interval().as_secs(),
                    "Starting scheduler job"
                );
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(job.interval().max(MIN_INTERVAL));
                    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    loop {
                        interval.tick().await;
                        if let Err(e) = job.run_once().await {
                            tracing::error!(job = job.name(), error = %e, "Scheduler job failed");
                        }
                    }
                })
            })
            .collect()
    }
}
