// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rewrite second-based integration expiries to milliseconds.

use super::{update_each, Migration};
use crate::db::{collections, FirestoreDb};
use crate::error::AppError;
use crate::time_utils::normalize_epoch_millis;
use async_trait::async_trait;
use serde_json::Value;

pub struct NormalizeIntegrationExpiry;

#[async_trait]
impl Migration for NormalizeIntegrationExpiry {
    fn id(&self) -> &'static str {
        "001-NormalizeIntegrationExpiry"
    }

    async fn up(&self, db: &FirestoreDb) -> Result<(), AppError> {
        update_each(db, collections::INTEGRATIONS, |doc| {
            let Some(expires_at) = doc.get("expiresAt").and_then(Value::as_i64) else {
                return Ok(false);
            };
            let normalized = normalize_epoch_millis(expires_at);
            if normalized == expires_at {
                return Ok(false);
            }
            doc.insert("expiresAt".to_string(), Value::from(normalized));
            Ok(true)
        })
        .await?;
        Ok(())
    }

    async fn down(&self, _db: &FirestoreDb) -> Result<(), AppError> {
        Err(AppError::Runtime(format!(
            "Migration {} is irreversible",
            self.id()
        )))
    }
}
