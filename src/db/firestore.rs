// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document store wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Accounts (wallet addresses and referral codes)
//! - Integrations (encrypted OAuth tokens)
//! - Activities (imported activities and payout state)
//!
//! plus the raw document and index operations used by migrations.

use crate::config::DatabaseConfig;
use crate::db::collections;
use crate::db::memory::MemoryStore;
use crate::error::AppError;
use crate::models::{Account, Activity, IntegrationRecord, PayoutState, ProviderKind};
use crate::time_utils::format_utc_rfc3339;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A raw document: its ID and top-level fields.
pub type RawDocument = (String, Map<String, Value>);

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
}

/// Document database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

impl FirestoreDb {
    /// Connect to the backend selected by configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        match config {
            DatabaseConfig::Firestore { project_id } => Self::new(project_id).await,
            DatabaseConfig::Memory => {
                tracing::warn!("Using in-memory document store (data is not persisted)");
                Ok(Self::new_memory())
            }
        }
    }

    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a store backed by process memory (development and tests).
    pub fn new_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::new())),
        }
    }

    // ─── Generic Document Operations ─────────────────────────────

    /// Get a document by ID.
    pub async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collection)
                .obj()
                .one(id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => store
                .get(collection, id)
                .map(|doc| from_doc(collection, doc))
                .transpose(),
        }
    }

    /// Create or replace a document.
    pub async fn put_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(id)
                    .object(doc)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => {
                let value = serde_json::to_value(doc)
                    .map_err(|e| AppError::Database(format!("Serialize failed: {}", e)))?;
                match value {
                    Value::Object(map) => store.put(collection, id, map),
                    other => {
                        return Err(AppError::Database(format!(
                            "Document {}/{} is not an object: {}",
                            collection, id, other
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    /// Delete a document (no-op if missing).
    pub async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(id)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => store.delete(collection, id),
        }
        Ok(())
    }

    /// Documents whose top-level `field` equals the string `value`.
    pub async fn query_eq<T>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let field = field.to_string();
                let value = value.to_string();
                client
                    .fluent()
                    .select()
                    .from(collection)
                    .filter(move |q| q.for_all([q.field(field.as_str()).eq(value.clone())]))
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
            Backend::Memory(store) => store
                .filter_eq(collection, field, value)
                .into_iter()
                .map(|doc| from_doc(collection, doc))
                .collect(),
        }
    }

    /// All documents in a collection with their IDs.
    pub async fn list_raw(&self, collection: &str) -> Result<Vec<RawDocument>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let docs = client
                    .fluent()
                    .select()
                    .from(collection)
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                docs.iter()
                    .map(|doc| {
                        let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
                        let fields: Map<String, Value> =
                            firestore::FirestoreDb::deserialize_doc_to(doc)
                                .map_err(|e| AppError::Database(e.to_string()))?;
                        Ok::<_, AppError>((id, fields))
                    })
                    .collect()
            }
            Backend::Memory(store) => Ok(store.list(collection)),
        }
    }

    /// Replace a document with raw fields.
    pub async fn put_raw(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(store) => {
                store.put(collection, id, fields.clone());
                Ok(())
            }
            Backend::Firestore(_) => self.put_doc(collection, id, fields).await,
        }
    }

    // ─── Index Operations ────────────────────────────────────────

    /// Declare a single-field index on `collection`.
    ///
    /// Firestore builds single-field indexes itself; the declaration is kept
    /// in the `_indexes` collection so deployment tooling can reconcile
    /// composite and exemption settings.
    pub async fn ensure_index(&self, collection: &str, field: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(store) => {
                store.ensure_index(collection, field);
                Ok(())
            }
            Backend::Firestore(_) => {
                let doc = serde_json::json!({
                    "collection": collection,
                    "field": field,
                    "createdAt": format_utc_rfc3339(chrono::Utc::now()),
                });
                self.put_doc(collections::INDEXES, &index_id(collection, field), &doc)
                    .await
            }
        }
    }

    /// Remove an index declaration.
    pub async fn drop_index(&self, collection: &str, field: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(store) => {
                store.drop_index(collection, field);
                Ok(())
            }
            Backend::Firestore(_) => {
                self.delete_doc(collections::INDEXES, &index_id(collection, field))
                    .await
            }
        }
    }

    /// Fields with a declared index on `collection`.
    pub async fn list_indexes(&self, collection: &str) -> Result<Vec<String>, AppError> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.indexes(collection)),
            Backend::Firestore(_) => {
                let docs: Vec<Value> = self
                    .query_eq(collections::INDEXES, "collection", collection)
                    .await?;
                Ok(docs
                    .iter()
                    .filter_map(|d| d.get("field").and_then(Value::as_str).map(String::from))
                    .collect())
            }
        }
    }

    // ─── Account Operations ──────────────────────────────────────

    pub async fn get_account(&self, address: &str) -> Result<Option<Account>, AppError> {
        self.get_doc(collections::ACCOUNTS, address).await
    }

    pub async fn upsert_account(&self, account: &Account) -> Result<(), AppError> {
        self.put_doc(collections::ACCOUNTS, &account.address, account)
            .await
    }

    // ─── Integration Operations ──────────────────────────────────

    pub async fn get_integration(
        &self,
        provider: ProviderKind,
        address: &str,
    ) -> Result<Option<IntegrationRecord>, AppError> {
        self.get_doc(
            collections::INTEGRATIONS,
            &IntegrationRecord::doc_id(provider, address),
        )
        .await
    }

    /// Find the integration for a provider-side identifier (webhook owner).
    pub async fn find_integration_by_remote_id(
        &self,
        provider: ProviderKind,
        remote_id: &str,
    ) -> Result<Option<IntegrationRecord>, AppError> {
        let records: Vec<IntegrationRecord> = self
            .query_eq(collections::INTEGRATIONS, "remoteId", remote_id)
            .await?;
        Ok(records.into_iter().find(|r| r.provider == provider))
    }

    pub async fn list_integrations(&self) -> Result<Vec<IntegrationRecord>, AppError> {
        self.list_raw(collections::INTEGRATIONS)
            .await?
            .into_iter()
            .map(|(_, doc)| from_doc(collections::INTEGRATIONS, doc))
            .collect()
    }

    pub async fn set_integration(&self, record: &IntegrationRecord) -> Result<(), AppError> {
        self.put_doc(collections::INTEGRATIONS, &record.id(), record)
            .await
    }

    pub async fn delete_integration(
        &self,
        provider: ProviderKind,
        address: &str,
    ) -> Result<(), AppError> {
        self.delete_doc(
            collections::INTEGRATIONS,
            &IntegrationRecord::doc_id(provider, address),
        )
        .await
    }

    // ─── Activity Operations ─────────────────────────────────────

    pub async fn get_activity(
        &self,
        provider: ProviderKind,
        remote_id: &str,
    ) -> Result<Option<Activity>, AppError> {
        self.get_doc(collections::ACTIVITIES, &Activity::doc_id(provider, remote_id))
            .await
    }

    pub async fn set_activity(&self, activity: &Activity) -> Result<(), AppError> {
        self.put_doc(collections::ACTIVITIES, &activity.id(), activity)
            .await
    }

    /// Activities in a payout state, ordered by queue position (unqueued last).
    pub async fn activities_in_state(
        &self,
        state: PayoutState,
    ) -> Result<Vec<Activity>, AppError> {
        let mut activities: Vec<Activity> = self
            .query_eq(collections::ACTIVITIES, "payoutState", state.as_str())
            .await?;
        activities.sort_by_key(|a| (a.queue_position.unwrap_or(u64::MAX), a.created_at.clone()));
        Ok(activities)
    }

    /// Highest queue position ever handed out, or 0.
    pub async fn max_queue_position(&self) -> Result<u64, AppError> {
        let docs = self.list_raw(collections::ACTIVITIES).await?;
        Ok(docs
            .iter()
            .filter_map(|(_, doc)| doc.get("queuePosition").and_then(Value::as_u64))
            .max()
            .unwrap_or(0))
    }
}

fn index_id(collection: &str, field: &str) -> String {
    format!("{}__{}", collection, field)
}

fn from_doc<T: DeserializeOwned>(collection: &str, doc: Map<String, Value>) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| AppError::Database(format!("Malformed document in {}: {}", collection, e)))
}
