// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth integration routes.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::ProviderKind;
use crate::oauth::state::{sign_state, verify_state};
use crate::time_utils::now_millis;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/oauth/{provider}/authorize", get(authorize))
        .route("/oauth/{provider}/callback", get(callback))
}

#[derive(Deserialize)]
pub struct AuthorizeParams {
    /// Wallet address the integration will be bound to.
    #[serde(default)]
    address: String,
}

#[derive(Serialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

/// Start the OAuth flow: return the provider URL the user must visit.
async fn authorize(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Json<ChallengeResponse>> {
    let address = params.address.trim();
    if address.is_empty() {
        return Err(AppError::InvalidArgument("address is required".to_string()));
    }

    let driver = state.integrations.drivers().resolve(&provider)?;
    let oauth_state = sign_state(
        address,
        state.config.oauth_state_key.as_bytes(),
        now_millis(),
    )?;
    let challenge = driver.get_auth_challenge(&oauth_state).await?;

    tracing::info!(provider = %provider, address, "Starting OAuth flow");
    Ok(Json(ChallengeResponse { challenge }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: exchange the code and redirect back to the frontend.
async fn callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend_url = state.config.frontend_url.trim_end_matches('/');
    let fail = |reason: &str| {
        Redirect::temporary(&format!(
            "{}/?error={}",
            frontend_url,
            urlencoding::encode(reason)
        ))
    };

    if let Some(error) = params.error {
        tracing::warn!(provider = %provider, error = %error, "OAuth error from provider");
        return fail(&error);
    }

    let address = match verify_state(
        &params.state,
        state.config.oauth_state_key.as_bytes(),
        now_millis(),
    ) {
        Ok(address) => address,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid or tampered state parameter");
            return fail("invalid_state");
        }
    };

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return fail("missing_code");
    };

    let kind = match provider.parse::<ProviderKind>() {
        Ok(kind) => kind,
        Err(_) => return fail("unknown_provider"),
    };

    match state.integrations.connect(kind, &code, &address).await {
        Ok(record) => {
            tracing::info!(
                provider = %provider,
                address = %record.account_address,
                "OAuth successful, integration stored"
            );
            Redirect::temporary(&format!(
                "{}/?connected={}",
                frontend_url,
                urlencoding::encode(&provider)
            ))
        }
        Err(e) => {
            tracing::error!(provider = %provider, error = %e, "OAuth token exchange failed");
            fail("connect_failed")
        }
    }
}
