// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration lifecycle: connect, token refresh, disconnect.
//!
//! Wraps the OAuth drivers with persistence. Tokens are encrypted before
//! they reach the database and expiries are stored in milliseconds.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{Account, IntegrationRecord, ProviderKind};
use crate::oauth::OAuthDrivers;
use crate::services::cipher::TokenCipher;
use crate::time_utils::{format_utc_rfc3339, now_millis};
use chrono::Utc;

/// Margin before token expiration when we proactively refresh (5 minutes).
pub const TOKEN_REFRESH_MARGIN_MS: i64 = 5 * 60 * 1000;

/// Persistence-aware wrapper around the OAuth drivers.
#[derive(Clone)]
pub struct IntegrationService {
    db: FirestoreDb,
    cipher: TokenCipher,
    drivers: OAuthDrivers,
}

impl IntegrationService {
    pub fn new(db: FirestoreDb, cipher: TokenCipher, drivers: OAuthDrivers) -> Self {
        Self {
            db,
            cipher,
            drivers,
        }
    }

    pub fn drivers(&self) -> &OAuthDrivers {
        &self.drivers
    }

    /// Exchange `code`, create the account if needed, and store the integration.
    pub async fn connect(
        &self,
        provider: ProviderKind,
        code: &str,
        address: &str,
    ) -> Result<IntegrationRecord, AppError> {
        let driver = self.drivers.get(provider)?;
        let grant = driver.exchange_token(code, address).await?;
        let now = format_utc_rfc3339(Utc::now());

        if self.db.get_account(address).await?.is_none() {
            let account = Account::new(address, &now)?;
            self.db.upsert_account(&account).await?;
            tracing::info!(address, "Account created");
        }

        // One local account per provider identity: drop a link held by another account.
        if let Some(previous) = self
            .db
            .find_integration_by_remote_id(provider, &grant.remote_id)
            .await?
        {
            if previous.account_address != address {
                tracing::warn!(
                    provider = %provider,
                    remote_id = %grant.remote_id,
                    previous = %previous.account_address,
                    address,
                    "Provider account re-linked to a different address"
                );
                self.db
                    .delete_integration(provider, &previous.account_address)
                    .await?;
            }
        }

        let created_at = self
            .db
            .get_integration(provider, address)
            .await?
            .map(|r| r.created_at)
            .unwrap_or_else(|| now.clone());

        let (access_enc, refresh_enc) =
            self.cipher
                .encrypt_tokens(&grant.access_token, &grant.refresh_token, address)?;

        let record = IntegrationRecord {
            provider,
            account_address: address.to_string(),
            remote_id: grant.remote_id,
            access_token_encrypted: access_enc,
            refresh_token_encrypted: refresh_enc,
            expires_at: grant.expires_at_ms,
            scopes: grant.scopes,
            created_at,
            updated_at: now,
        };

        self.db.set_integration(&record).await?;

        tracing::info!(
            provider = %provider,
            address,
            remote_id = %record.remote_id,
            "Integration connected"
        );
        Ok(record)
    }

    /// A usable access token for `record`, refreshing when near expiry.
    pub async fn valid_access_token(&self, record: &IntegrationRecord) -> Result<String, AppError> {
        if !record.expires_within(now_millis(), TOKEN_REFRESH_MARGIN_MS) {
            return self
                .cipher
                .decrypt(&record.access_token_encrypted, record.account_address.as_bytes());
        }

        tracing::info!(
            provider = %record.provider,
            address = %record.account_address,
            "Access token expired, refreshing"
        );
        let (_, access_token) = self.refresh(record).await?;
        Ok(access_token)
    }

    /// Refresh and persist tokens; returns the new record and plaintext access token.
    pub async fn refresh(
        &self,
        record: &IntegrationRecord,
    ) -> Result<(IntegrationRecord, String), AppError> {
        let driver = self.drivers.get(record.provider)?;
        let address = record.account_address.as_str();

        let refresh_token = self
            .cipher
            .decrypt(&record.refresh_token_encrypted, address.as_bytes())?;
        let tokens = driver.refresh_token(&refresh_token).await?;

        let (access_enc, refresh_enc) =
            self.cipher
                .encrypt_tokens(&tokens.access_token, &tokens.refresh_token, address)?;

        let updated = IntegrationRecord {
            access_token_encrypted: access_enc,
            refresh_token_encrypted: refresh_enc,
            expires_at: tokens.expires_at_ms,
            updated_at: format_utc_rfc3339(Utc::now()),
            ..record.clone()
        };
        self.db.set_integration(&updated).await?;

        tracing::info!(
            provider = %record.provider,
            address,
            expires_at = updated.expires_at,
            "Token refreshed"
        );
        Ok((updated, tokens.access_token))
    }

    /// Handle a provider deauthorization notice for `remote_id`.
    ///
    /// The notice is only trusted once the provider rejects our token;
    /// returns whether the integration was removed.
    pub async fn handle_deauthorization(
        &self,
        provider: ProviderKind,
        remote_id: &str,
    ) -> Result<bool, AppError> {
        let Some(record) = self
            .db
            .find_integration_by_remote_id(provider, remote_id)
            .await?
        else {
            tracing::debug!(provider = %provider, remote_id, "No integration for deauthorized user");
            return Ok(false);
        };

        let driver = self.drivers.get(provider)?;
        let revoked = match self.valid_access_token(&record).await {
            Ok(token) => match driver.token_active(&token).await {
                Ok(active) => !active,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to verify deauthorization (assuming real)");
                    true
                }
            },
            // The refresh token itself was rejected.
            Err(e) if e.is_remote_auth_error() || e.remote_status() == Some(400) => {
                tracing::info!(
                    provider = %provider,
                    remote_id,
                    status = ?e.remote_status(),
                    "Refresh rejected by provider, deauthorization confirmed"
                );
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to verify deauthorization (assuming real)");
                true
            }
        };

        if !revoked {
            tracing::warn!(
                provider = %provider,
                remote_id,
                "Security Alert: Received FAKE deauthorization webhook (token still valid)"
            );
            return Ok(false);
        }

        self.db
            .delete_integration(provider, &record.account_address)
            .await?;
        tracing::info!(
            provider = %provider,
            address = %record.account_address,
            "Integration removed after deauthorization"
        );
        Ok(true)
    }

    /// Delete the integration and revoke remote access (best effort).
    pub async fn disconnect(&self, provider: ProviderKind, address: &str) -> Result<bool, AppError> {
        let Some(record) = self.db.get_integration(provider, address).await? else {
            return Ok(false);
        };

        // Resolve the token first: a refresh persists the record, so it must
        // happen before the delete.
        let token = self.valid_access_token(&record).await;

        self.db.delete_integration(provider, address).await?;

        match token {
            Ok(token) => {
                if let Err(e) = self.drivers.get(provider)?.deauthorize(&token).await {
                    tracing::warn!(error = %e, address, "Remote deauthorization failed");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, address, "No usable token for deauthorization");
            }
        }

        tracing::info!(provider = %provider, address, "Integration disconnected");
        Ok(true)
    }
}
