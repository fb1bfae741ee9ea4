// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! OAuth integration model for storage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Third-party fitness provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Strava,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Strava => "strava",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strava" => Ok(ProviderKind::Strava),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown provider: {}",
                other
            ))),
        }
    }
}

/// OAuth tokens for one (provider, account) pair, encrypted at rest.
///
/// Stored in the `integrations` collection under [`IntegrationRecord::doc_id`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationRecord {
    pub provider: ProviderKind,
    /// Local account (wallet address) this integration belongs to
    pub account_address: String,
    /// Provider-side identifier (Strava athlete ID)
    pub remote_id: String,
    /// Encrypted access token (base64)
    pub access_token_encrypted: String,
    /// Encrypted refresh token (base64)
    pub refresh_token_encrypted: String,
    /// Access token expiry, milliseconds since epoch
    pub expires_at: i64,
    /// Granted OAuth scopes
    #[serde(default)]
    pub scopes: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl IntegrationRecord {
    pub fn doc_id(provider: ProviderKind, account_address: &str) -> String {
        format!("{}_{}", provider, account_address)
    }

    pub fn id(&self) -> String {
        Self::doc_id(self.provider, &self.account_address)
    }

    /// Whether the access token expires within `margin_ms` of `now_ms`.
    pub fn expires_within(&self, now_ms: i64, margin_ms: i64) -> bool {
        now_ms + margin_ms >= self.expires_at
    }
}
