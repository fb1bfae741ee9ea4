// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook-triggered activity import.
//!
//! Downloads the activity from the provider using the owner's integration
//! and stores it with payout state `not_started`. Imports are idempotent:
//! an activity already stored is returned unchanged.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{Activity, PayoutState, ProviderKind};
use crate::services::integration::IntegrationService;
use crate::time_utils::format_utc_rfc3339;
use chrono::Utc;

/// Imports activities announced by provider webhooks.
#[derive(Clone)]
pub struct ActivityImporter {
    db: FirestoreDb,
    integrations: IntegrationService,
}

impl ActivityImporter {
    pub fn new(db: FirestoreDb, integrations: IntegrationService) -> Self {
        Self { db, integrations }
    }

    /// Import `activity_id` owned by provider user `owner_id`.
    ///
    /// Returns `None` when no local account is linked to the owner.
    pub async fn import(
        &self,
        provider: ProviderKind,
        owner_id: &str,
        activity_id: &str,
    ) -> Result<Option<Activity>, AppError> {
        if let Some(existing) = self.db.get_activity(provider, activity_id).await? {
            tracing::debug!(activity_id, "Activity already imported (idempotent skip)");
            return Ok(Some(existing));
        }

        let Some(record) = self
            .db
            .find_integration_by_remote_id(provider, owner_id)
            .await?
        else {
            tracing::warn!(
                provider = %provider,
                owner_id,
                activity_id,
                "Activity for unknown owner, ignoring"
            );
            return Ok(None);
        };

        let access_token = self.integrations.valid_access_token(&record).await?;
        let remote = self
            .integrations
            .drivers()
            .get(provider)?
            .get_activity(&access_token, activity_id)
            .await?;

        let now = format_utc_rfc3339(Utc::now());
        let activity = Activity {
            provider,
            remote_id: remote.remote_id,
            account_address: record.account_address,
            name: remote.name,
            sport_type: remote.sport_type,
            start_date: remote.start_date,
            distance_meters: remote.distance_meters,
            payout_state: PayoutState::NotStarted,
            queue_position: None,
            payout_error: None,
            created_at: now.clone(),
            updated_at: now,
        };

        self.db.set_activity(&activity).await?;

        tracing::info!(
            provider = %provider,
            activity_id = %activity.remote_id,
            address = %activity.account_address,
            "Activity imported"
        );
        Ok(Some(activity))
    }
}
