// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth drivers for third-party fitness providers.
//!
//! Drivers talk to the provider and persist nothing; the integration
//! service owns storage. Token expiries leaving a driver are always in
//! milliseconds since epoch.

pub mod state;
pub mod strava;

use crate::config::Config;
use crate::error::AppError;
use crate::models::ProviderKind;
use std::collections::BTreeMap;

pub use strava::StravaDriver;

/// Tokens obtained from an authorization code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Milliseconds since epoch
    pub expires_at_ms: i64,
    /// Provider-side user identifier
    pub remote_id: String,
    /// Local account the grant is bound to
    pub account_address: String,
    pub scopes: Vec<String>,
}

/// Tokens obtained from a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Milliseconds since epoch
    pub expires_at_ms: i64,
}

/// A provider-side webhook subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookSubscription {
    pub id: String,
    pub callback_url: String,
}

/// Activity fields common to every provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteActivity {
    pub remote_id: String,
    pub name: String,
    pub sport_type: String,
    pub start_date: String,
    pub distance_meters: f64,
}

/// A configured driver, tagged by provider.
#[derive(Clone)]
pub enum OAuthDriver {
    Strava(StravaDriver),
}

impl OAuthDriver {
    pub fn kind(&self) -> ProviderKind {
        match self {
            OAuthDriver::Strava(_) => ProviderKind::Strava,
        }
    }

    pub async fn get_auth_challenge(&self, state: &str) -> Result<String, AppError> {
        match self {
            OAuthDriver::Strava(d) => d.get_auth_challenge(state).await,
        }
    }

    pub async fn exchange_token(
        &self,
        auth_code: &str,
        address: &str,
    ) -> Result<TokenGrant, AppError> {
        match self {
            OAuthDriver::Strava(d) => d.exchange_token(auth_code, address).await,
        }
    }

    pub fn validate_webhook_subscription(
        &self,
        hub_challenge: &str,
        verify_token: &str,
    ) -> Result<String, AppError> {
        match self {
            OAuthDriver::Strava(d) => d.validate_webhook_subscription(hub_challenge, verify_token),
        }
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedTokens, AppError> {
        match self {
            OAuthDriver::Strava(d) => d.refresh_token(refresh_token).await,
        }
    }

    pub async fn deauthorize(&self, access_token: &str) -> Result<(), AppError> {
        match self {
            OAuthDriver::Strava(d) => d.deauthorize(access_token).await,
        }
    }

    pub async fn subscribe_webhook(&self) -> Result<WebhookSubscription, AppError> {
        match self {
            OAuthDriver::Strava(d) => d.subscribe_webhook().await,
        }
    }

    pub async fn list_webhook_subscriptions(&self) -> Result<Vec<WebhookSubscription>, AppError> {
        match self {
            OAuthDriver::Strava(d) => d.list_webhook_subscriptions().await,
        }
    }

    pub async fn get_activity(
        &self,
        access_token: &str,
        activity_id: &str,
    ) -> Result<RemoteActivity, AppError> {
        match self {
            OAuthDriver::Strava(d) => {
                let a = d.get_activity(access_token, activity_id).await?;
                Ok(RemoteActivity {
                    remote_id: a.id.to_string(),
                    name: a.name,
                    sport_type: a.sport_type,
                    start_date: a.start_date,
                    distance_meters: a.distance,
                })
            }
        }
    }

    /// Whether `access_token` is still accepted by the provider.
    ///
    /// `Ok(false)` on 401/403, errors otherwise propagate.
    pub async fn token_active(&self, access_token: &str) -> Result<bool, AppError> {
        let result = match self {
            OAuthDriver::Strava(d) => d.get_athlete(access_token).await.map(|_| ()),
        };
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_remote_auth_error() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Drivers registered at startup, keyed by provider.
#[derive(Clone, Default)]
pub struct OAuthDrivers {
    drivers: BTreeMap<ProviderKind, OAuthDriver>,
}

impl OAuthDrivers {
    /// Instantiate one driver per assembled provider module.
    pub fn build(providers: &[ProviderKind], config: &Config, http: &reqwest::Client) -> Self {
        let mut drivers = BTreeMap::new();
        for kind in providers {
            let Some(settings) = config.provider(kind.as_str()) else {
                tracing::warn!(provider = %kind, "Provider module without settings, skipping");
                continue;
            };
            let driver = match kind {
                ProviderKind::Strava => OAuthDriver::Strava(StravaDriver::new(settings, http.clone())),
            };
            tracing::info!(provider = %kind, "OAuth driver registered");
            drivers.insert(*kind, driver);
        }
        Self { drivers }
    }

    pub fn insert(&mut self, driver: OAuthDriver) {
        self.drivers.insert(driver.kind(), driver);
    }

    /// Driver for `provider`, or `InvalidArgument` if it isn't enabled.
    pub fn get(&self, provider: ProviderKind) -> Result<&OAuthDriver, AppError> {
        self.drivers.get(&provider).ok_or_else(|| {
            AppError::InvalidArgument(format!("Provider not enabled: {}", provider))
        })
    }

    /// Resolve a provider name from a URL path segment.
    pub fn resolve(&self, name: &str) -> Result<&OAuthDriver, AppError> {
        let kind: ProviderKind = name.parse()?;
        self.get(kind)
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.drivers.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_registers_configured_providers() {
        let config = Config::test_default();
        let drivers = OAuthDrivers::build(&[ProviderKind::Strava], &config, &reqwest::Client::new());
        assert_eq!(drivers.kinds(), vec![ProviderKind::Strava]);
        assert!(drivers.resolve("strava").is_ok());
        assert!(matches!(
            drivers.resolve("garmin"),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_build_skips_disabled_provider() {
        let mut config = Config::test_default();
        if let Some(s) = config.providers.get_mut("strava") {
            s.enabled = false;
        }
        let drivers = OAuthDrivers::build(&[ProviderKind::Strava], &config, &reqwest::Client::new());
        assert!(drivers.is_empty());
    }
}
