// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Add payout bookkeeping fields to activities.

use super::{unset_fields, update_each, Migration};
use crate::db::{collections, FirestoreDb};
use crate::error::AppError;
use crate::models::PayoutState;
use async_trait::async_trait;
use serde_json::Value;

const PAYOUT_STATE: &str = "payoutState";
const QUEUE_POSITION: &str = "queuePosition";

pub struct AddActivityPayoutFields;

#[async_trait]
impl Migration for AddActivityPayoutFields {
    fn id(&self) -> &'static str {
        "003-AddActivityPayoutFields"
    }

    async fn up(&self, db: &FirestoreDb) -> Result<(), AppError> {
        update_each(db, collections::ACTIVITIES, |doc| {
            let mut changed = false;
            if !doc.contains_key(PAYOUT_STATE) {
                doc.insert(
                    PAYOUT_STATE.to_string(),
                    Value::from(PayoutState::NotStarted.as_str()),
                );
                changed = true;
            }
            if !doc.contains_key(QUEUE_POSITION) {
                doc.insert(QUEUE_POSITION.to_string(), Value::Null);
                changed = true;
            }
            Ok(changed)
        })
        .await?;
        db.ensure_index(collections::ACTIVITIES, PAYOUT_STATE).await
    }

    async fn down(&self, db: &FirestoreDb) -> Result<(), AppError> {
        unset_fields(db, collections::ACTIVITIES, &[PAYOUT_STATE, QUEUE_POSITION]).await?;
        db.drop_index(collections::ACTIVITIES, PAYOUT_STATE).await
    }
}
