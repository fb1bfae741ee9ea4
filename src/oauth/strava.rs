// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth driver.
//!
//! Handles:
//! - Authorization challenge and code exchange
//! - Token refresh and deauthorization
//! - Webhook subscription handshake and management
//! - Activity download for webhook-triggered imports

use crate::config::ProviderSettings;
use crate::error::AppError;
use crate::oauth::{RefreshedTokens, TokenGrant, WebhookSubscription};
use crate::services::remote::{CallOptions, HttpMethod, RemoteClient};
use crate::time_utils::seconds_to_millis;
use serde::Deserialize;
use subtle::ConstantTimeEq;

/// Strava driver bound to one provider configuration.
#[derive(Clone)]
pub struct StravaDriver {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    webhook_url: String,
    verify_token: String,
    scope: String,
    oauth: RemoteClient,
    api: RemoteClient,
    subscriptions: RemoteClient,
}

impl StravaDriver {
    pub fn new(settings: &ProviderSettings, http: reqwest::Client) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_url: settings.redirect_url.clone(),
            webhook_url: settings.webhook_url.clone(),
            verify_token: settings.verify_token.clone(),
            scope: settings.scope.clone(),
            oauth: RemoteClient::new("strava-oauth", &settings.oauth_url, http.clone()),
            api: RemoteClient::new("strava", &settings.api_url, http.clone()),
            subscriptions: RemoteClient::new("strava-subscriptions", &settings.subscribe_url, http),
        }
    }

    /// Issue the authorize request and return the URL the user must visit.
    ///
    /// Strava answers with (or redirects to) its consent page; the final URL
    /// is returned as an opaque challenge for the frontend to open.
    pub async fn get_auth_challenge(&self, state: &str) -> Result<String, AppError> {
        let options = CallOptions::new()
            .param("client_id", self.client_id.as_str())
            .param("redirect_uri", self.redirect_url.as_str())
            .param("response_type", "code")
            .param("approval_prompt", "auto")
            .param("scope", self.scope.as_str())
            .param("state", state);

        let response = self
            .oauth
            .call(HttpMethod::Get, "authorize", options)
            .await?;

        tracing::debug!(url = %response.url, "Strava authorization challenge issued");
        Ok(response.url)
    }

    /// Exchange an authorization code for tokens bound to `address`.
    pub async fn exchange_token(
        &self,
        auth_code: &str,
        address: &str,
    ) -> Result<TokenGrant, AppError> {
        let options = self
            .client_credentials()
            .param("code", auth_code)
            .param("grant_type", "authorization_code");

        let response = self
            .oauth
            .call(HttpMethod::Post, "token", options)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Strava token exchange failed"))?;

        let token: StravaTokenResponse = response.json()?;
        let athlete = token.athlete.ok_or_else(|| AppError::RemoteService {
            service: self.oauth.name().to_string(),
            status: Some(response.status),
            message: "Token response missing athlete".to_string(),
        })?;

        tracing::info!(athlete_id = athlete.id, address, "Strava token exchange succeeded");

        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at_ms: seconds_to_millis(token.expires_at),
            remote_id: athlete.id.to_string(),
            account_address: address.to_string(),
            scopes: self.scopes(),
        })
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedTokens, AppError> {
        let options = self
            .client_credentials()
            .param("refresh_token", refresh_token)
            .param("grant_type", "refresh_token");

        let response = self.oauth.call(HttpMethod::Post, "token", options).await?;
        let token: StravaTokenResponse = response.json()?;

        Ok(RefreshedTokens {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at_ms: seconds_to_millis(token.expires_at),
        })
    }

    /// Revoke all tokens for the user behind `access_token`.
    pub async fn deauthorize(&self, access_token: &str) -> Result<(), AppError> {
        self.oauth
            .call(
                HttpMethod::Post,
                "deauthorize",
                CallOptions::new().bearer(access_token),
            )
            .await?;
        tracing::info!("Strava deauthorization successful");
        Ok(())
    }

    /// Echo the hub challenge if `verify_token` matches our secret.
    pub fn validate_webhook_subscription(
        &self,
        hub_challenge: &str,
        verify_token: &str,
    ) -> Result<String, AppError> {
        let matches: bool = !self.verify_token.is_empty()
            && bool::from(verify_token.as_bytes().ct_eq(self.verify_token.as_bytes()));

        if !matches {
            return Err(AppError::InvalidArgument(
                "Webhook verify token mismatch".to_string(),
            ));
        }
        Ok(hub_challenge.to_string())
    }

    /// Register our webhook callback with Strava.
    ///
    /// Strava calls back synchronously with the handshake, so the server
    /// must already be reachable at `webhook_url`.
    pub async fn subscribe_webhook(&self) -> Result<WebhookSubscription, AppError> {
        let options = self
            .client_credentials()
            .param("callback_url", self.webhook_url.as_str())
            .param("verify_token", self.verify_token.as_str());

        let response = self
            .subscriptions
            .call(HttpMethod::Post, "", options)
            .await?;
        let created: StravaSubscription = response.json()?;

        tracing::info!(subscription_id = created.id, "Strava webhook subscription created");
        Ok(WebhookSubscription {
            id: created.id.to_string(),
            callback_url: created
                .callback_url
                .unwrap_or_else(|| self.webhook_url.clone()),
        })
    }

    /// List existing webhook subscriptions for this application.
    pub async fn list_webhook_subscriptions(&self) -> Result<Vec<WebhookSubscription>, AppError> {
        let options = CallOptions::new()
            .param("client_id", self.client_id.as_str())
            .param("client_secret", self.client_secret.as_str());

        let response = self
            .subscriptions
            .call(HttpMethod::Get, "", options)
            .await?;
        let subs: Vec<StravaSubscription> = response.json()?;

        Ok(subs
            .into_iter()
            .map(|s| WebhookSubscription {
                id: s.id.to_string(),
                callback_url: s.callback_url.unwrap_or_default(),
            })
            .collect())
    }

    /// Get a detailed activity by ID.
    pub async fn get_activity(
        &self,
        access_token: &str,
        activity_id: &str,
    ) -> Result<StravaActivity, AppError> {
        let response = self
            .api
            .call(
                HttpMethod::Get,
                &format!("activities/{}", activity_id),
                CallOptions::new().bearer(access_token),
            )
            .await?;
        response.json()
    }

    /// Get the authenticated athlete (cheap token liveness check).
    pub async fn get_athlete(&self, access_token: &str) -> Result<StravaAthlete, AppError> {
        let response = self
            .api
            .call(
                HttpMethod::Get,
                "athlete",
                CallOptions::new().bearer(access_token),
            )
            .await?;
        response.json()
    }

    fn client_credentials(&self) -> CallOptions {
        CallOptions::new()
            .form()
            .param("client_id", self.client_id.as_str())
            .param("client_secret", self.client_secret.as_str())
    }

    fn scopes(&self) -> Vec<String> {
        self.scope
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Token response from Strava OAuth (athlete only on code exchange).
#[derive(Debug, Clone, Deserialize)]
struct StravaTokenResponse {
    access_token: String,
    refresh_token: String,
    /// Epoch seconds
    expires_at: i64,
    #[serde(default)]
    athlete: Option<StravaAthlete>,
}

/// Athlete summary.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    pub id: u64,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

/// Push subscription as returned by Strava.
#[derive(Debug, Clone, Deserialize)]
struct StravaSubscription {
    id: u64,
    #[serde(default)]
    callback_url: Option<String>,
}

/// Detailed Strava activity response (fields we store).
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivity {
    pub id: u64,
    pub name: String,
    pub sport_type: String,
    pub start_date: String,
    pub distance: f64,
}
