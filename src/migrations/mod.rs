// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-shot document migrations.
//!
//! Migrations run strictly in order, one at a time. Applied ids are
//! recorded in the `changelog` collection so `up` only runs pending
//! migrations and `down` only reverts the most recently applied one.

mod m001_normalize_integration_expiry;
mod m002_add_account_referral_code;
mod m003_add_activity_payout_fields;

pub use m001_normalize_integration_expiry::NormalizeIntegrationExpiry;
pub use m002_add_account_referral_code::AddAccountReferralCode;
pub use m003_add_activity_payout_fields::AddActivityPayoutFields;

use crate::db::{collections, FirestoreDb};
use crate::error::AppError;
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A reversible (or explicitly irreversible) document migration.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Stable identifier, e.g. `002-AddAccountReferralCode`.
    fn id(&self) -> &'static str;

    async fn up(&self, db: &FirestoreDb) -> Result<(), AppError>;

    async fn down(&self, db: &FirestoreDb) -> Result<(), AppError>;
}

/// Changelog entry for an applied migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub id: String,
    pub applied_at: String,
}

/// Status of one known migration.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationStatus {
    pub id: &'static str,
    pub applied_at: Option<String>,
}

/// All migrations in application order.
pub fn all() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(NormalizeIntegrationExpiry),
        Box::new(AddAccountReferralCode),
        Box::new(AddActivityPayoutFields),
    ]
}

/// Applies and reverts migrations against a database.
pub struct MigrationRunner {
    db: FirestoreDb,
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRunner {
    pub fn new(db: FirestoreDb) -> Self {
        Self::with_migrations(db, all())
    }

    pub fn with_migrations(db: FirestoreDb, migrations: Vec<Box<dyn Migration>>) -> Self {
        Self { db, migrations }
    }

    async fn applied(&self) -> Result<Vec<ChangelogEntry>, AppError> {
        let mut entries = Vec::new();
        for (_, doc) in self.db.list_raw(collections::CHANGELOG).await? {
            let entry: ChangelogEntry = serde_json::from_value(Value::Object(doc))
                .map_err(|e| AppError::Database(format!("Malformed changelog entry: {}", e)))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Apply every pending migration in order; returns the ids applied.
    pub async fn up(&self) -> Result<Vec<&'static str>, AppError> {
        let applied = self.applied().await?;
        let mut ran = Vec::new();

        for migration in &self.migrations {
            let id = migration.id();
            if applied.iter().any(|e| e.id == id) {
                continue;
            }

            tracing::info!(migration = id, "Applying migration");
            migration.up(&self.db).await.inspect_err(|e| {
                tracing::error!(migration = id, error = %e, "Migration failed");
            })?;

            let entry = ChangelogEntry {
                id: id.to_string(),
                applied_at: format_utc_rfc3339(Utc::now()),
            };
            self.db.put_doc(collections::CHANGELOG, id, &entry).await?;
            ran.push(id);
        }

        if ran.is_empty() {
            tracing::info!("No pending migrations");
        }
        Ok(ran)
    }

    /// Revert the most recently applied migration; returns its id.
    pub async fn down(&self) -> Result<Option<&'static str>, AppError> {
        let applied = self.applied().await?;

        let Some(migration) = self
            .migrations
            .iter()
            .rev()
            .find(|m| applied.iter().any(|e| e.id == m.id()))
        else {
            tracing::info!("No applied migrations to revert");
            return Ok(None);
        };

        let id = migration.id();
        tracing::info!(migration = id, "Reverting migration");
        migration.down(&self.db).await?;
        self.db.delete_doc(collections::CHANGELOG, id).await?;
        Ok(Some(id))
    }

    pub async fn status(&self) -> Result<Vec<MigrationStatus>, AppError> {
        let applied = self.applied().await?;
        Ok(self
            .migrations
            .iter()
            .map(|m| MigrationStatus {
                id: m.id(),
                applied_at: applied
                    .iter()
                    .find(|e| e.id == m.id())
                    .map(|e| e.applied_at.clone()),
            })
            .collect())
    }
}

// ─── Field Helpers ───────────────────────────────────────────────

/// Rewrite every document of `collection` with `f`; documents for which
/// `f` returns `false` are left untouched. Returns the number rewritten.
pub(crate) async fn update_each<F>(
    db: &FirestoreDb,
    collection: &str,
    mut f: F,
) -> Result<usize, AppError>
where
    F: FnMut(&mut Map<String, Value>) -> Result<bool, AppError> + Send,
{
    let mut changed = 0;
    for (id, mut doc) in db.list_raw(collection).await? {
        if f(&mut doc)? {
            db.put_raw(collection, &id, &doc).await?;
            changed += 1;
        }
    }
    tracing::info!(collection, changed, "Documents updated");
    Ok(changed)
}

/// Remove `fields` from every document of `collection`.
pub(crate) async fn unset_fields(
    db: &FirestoreDb,
    collection: &str,
    fields: &[&str],
) -> Result<usize, AppError> {
    update_each(db, collection, |doc| {
        let mut removed = false;
        for field in fields {
            removed |= doc.remove(*field).is_some();
        }
        Ok(removed)
    })
    .await
}
