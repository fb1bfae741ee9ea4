// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward runtime API server.
//!
//! Loads the static configuration, assembles the enabled scheduler jobs and
//! OAuth drivers, then serves the OAuth and webhook routes.

use reward_runtime::{
    config::Config,
    db::FirestoreDb,
    modules::{assemble_modules, ModuleDescriptor},
    scheduler::Scheduler,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging for GCP
    init_logging();

    let config = Config::load()?;
    tracing::info!(port = config.port, "Starting reward runtime");

    let db = FirestoreDb::connect(&config.database).await?;

    let modules = assemble_modules(&config);
    let mut jobs = Vec::new();
    let mut providers = Vec::new();
    for module in &modules {
        match module {
            ModuleDescriptor::Scheduler(kind) => jobs.push(*kind),
            ModuleDescriptor::OAuthDriver(kind) => providers.push(*kind),
        }
    }
    tracing::info!(
        jobs = jobs.len(),
        providers = providers.len(),
        "Modules assembled"
    );

    let state = Arc::new(AppState::with_providers(config.clone(), db, &providers)?);

    if state.integrations.drivers().is_empty() {
        tracing::warn!("No OAuth providers enabled");
    }

    let _handles = Scheduler::from_modules(&jobs, state.clone()).spawn();

    let app = reward_runtime::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("reward_runtime=debug,info")),
        )
        .with(format)
        .init();
}
