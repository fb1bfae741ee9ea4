// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token refresh job: keeps stored access tokens ahead of expiry.

use crate::error::AppError;
use crate::scheduler::ScheduledJob;
use crate::services::integration::TOKEN_REFRESH_MARGIN_MS;
use crate::time_utils::now_millis;
use crate::AppState;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Counts from one pass of the job.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TokenRefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
}

pub struct TokenRefreshJob {
    state: Arc<AppState>,
}

impl TokenRefreshJob {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Tokens expiring before the next pass (plus the usual margin) are refreshed now.
    fn margin_ms(&self) -> i64 {
        let interval_ms = self
            .state
            .config
            .scheduler
            .token_refresh_interval_secs
            .saturating_mul(1000);
        i64::try_from(interval_ms)
            .unwrap_or(i64::MAX)
            .saturating_add(TOKEN_REFRESH_MARGIN_MS)
    }

    pub async fn run(&self) -> Result<TokenRefreshSummary, AppError> {
        let now = now_millis();
        let margin = self.margin_ms();
        let mut summary = TokenRefreshSummary::default();

        for record in self.state.db.list_integrations().await? {
            if !record.expires_within(now, margin) {
                continue;
            }
            // Skip providers that were disabled after the record was created.
            if self.state.integrations.drivers().get(record.provider).is_err() {
                continue;
            }

            match self.state.integrations.refresh(&record).await {
                Ok(_) => summary.refreshed += 1,
                Err(e) => {
                    tracing::warn!(
                        provider = %record.provider,
                        address = %record.account_address,
                        error = %e,
                        "Token refresh failed"
                    );
                    summary.failed += 1;
                }
            }
        }

        if summary.refreshed + summary.failed > 0 {
            tracing::info!(
                refreshed = summary.refreshed,
                failed = summary.failed,
                "Token refresh pass complete"
            );
        }
        Ok(summary)
    }
}

#[async_trait]
impl ScheduledJob for TokenRefreshJob {
    fn name(&self) -> &'static str {
        "token-refresh"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.state.config.scheduler.token_refresh_interval_secs)
    }

    async fn run_once(&self) -> Result<(), AppError> {
        self.run().await.map(|_| ())
    }
}
