// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Reward runtime: backend for a fitness-rewards application.
//!
//! This crate connects wallet accounts to fitness providers over OAuth,
//! imports activities announced by provider webhooks, and pays them out
//! through a queue driven by configurable scheduler jobs.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod modules;
pub mod oauth;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod time_utils;

use anyhow::Context;
use config::Config;
use db::FirestoreDb;
use error::AppError;
use models::ProviderKind;
use oauth::OAuthDrivers;
use services::{ActivityImporter, IntegrationService, RemoteServices, TokenCipher};
use std::time::Duration;

/// Timeout applied to every outbound HTTP request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub remote: RemoteServices,
    pub integrations: IntegrationService,
    pub importer: ActivityImporter,
}

impl AppState {
    /// Wire up services for `config` on top of an already connected database.
    pub fn new(config: Config, db: FirestoreDb) -> Result<Self, AppError> {
        let providers = modules::oauth_driver_modules(&config);
        Self::with_providers(config, db, &providers)
    }

    /// Like [`AppState::new`], registering only the already assembled `providers`.
    pub fn with_providers(
        config: Config,
        db: FirestoreDb,
        providers: &[ProviderKind],
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building HTTP client")?;
        Self::with_http(config, db, http, providers)
    }

    pub fn with_http(
        config: Config,
        db: FirestoreDb,
        http: reqwest::Client,
        providers: &[ProviderKind],
    ) -> Result<Self, AppError> {
        let drivers = OAuthDrivers::build(providers, &config, &http);
        let remote = RemoteServices::from_config(&config, &http);
        let cipher = TokenCipher::new(config.token_encryption_key.as_bytes())?;

        let integrations = IntegrationService::new(db.clone(), cipher, drivers);
        let importer = ActivityImporter::new(db.clone(), integrations.clone());

        Ok(Self {
            config,
            db,
            remote,
            integrations,
            importer,
        })
    }

    /// State backed by the in-memory store.
    pub fn in_memory(config: Config) -> Result<Self, AppError> {
        Self::new(config, FirestoreDb::new_memory())
    }
}
