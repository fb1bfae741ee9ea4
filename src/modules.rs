// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Configuration-driven module assembly.
//!
//! Resolves, once at startup, which scheduler jobs and OAuth drivers are
//! registered. Unknown names are logged and skipped; order follows the
//! configuration.

use crate::config::Config;
use crate::models::ProviderKind;
use std::fmt;

/// Scheduler jobs known to this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerJobKind {
    /// Queue new activities and disburse payouts in queue order.
    PayoutQueue,
    /// Refresh integration tokens before they expire.
    TokenRefresh,
}

impl SchedulerJobKind {
    pub const ALL: &'static [SchedulerJobKind] =
        &[SchedulerJobKind::PayoutQueue, SchedulerJobKind::TokenRefresh];

    pub fn name(&self) -> &'static str {
        match self {
            SchedulerJobKind::PayoutQueue => "payout-queue",
            SchedulerJobKind::TokenRefresh => "token-refresh",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

impl fmt::Display for SchedulerJobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A module to register at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleDescriptor {
    Scheduler(SchedulerJobKind),
    OAuthDriver(ProviderKind),
}

/// Enabled scheduler modules, in configuration order.
///
/// Empty when `scheduler_enabled` is false. Unknown and repeated names are
/// skipped with a warning.
pub fn scheduler_modules(config: &Config) -> Vec<SchedulerJobKind> {
    if !config.scheduler_enabled {
        if !config.scheduler_modules.is_empty() {
            tracing::info!(
                count = config.scheduler_modules.len(),
                "Scheduler disabled, not registering scheduler modules"
            );
        }
        return Vec::new();
    }

    let mut modules = Vec::with_capacity(config.scheduler_modules.len());
    for name in &config.scheduler_modules {
        match SchedulerJobKind::from_name(name.trim()) {
            Some(kind) if modules.contains(&kind) => {
                tracing::warn!(module = %name, "Duplicate scheduler module, skipping");
            }
            Some(kind) => modules.push(kind),
            None => {
                tracing::warn!(module = %name, "Unknown scheduler module, skipping");
            }
        }
    }
    modules
}

/// Enabled OAuth provider modules, in provider-name order.
pub fn oauth_driver_modules(config: &Config) -> Vec<ProviderKind> {
    config
        .providers
        .iter()
        .filter(|(_, settings)| settings.enabled)
        .filter_map(|(name, _)| match name.parse::<ProviderKind>() {
            Ok(kind) => Some(kind),
            Err(_) => {
                tracing::warn!(provider = %name, "Unknown OAuth provider, skipping");
                None
            }
        })
        .collect()
}

/// All modules to register: scheduler jobs first, then OAuth drivers.
pub fn assemble_modules(config: &Config) -> Vec<ModuleDescriptor> {
    let modules: Vec<ModuleDescriptor> = scheduler_modules(config)
        .into_iter()
        .map(ModuleDescriptor::Scheduler)
        .chain(
            oauth_driver_modules(config)
                .into_iter()
                .map(ModuleDescriptor::OAuthDriver),
        )
        .collect();

    tracing::info!(?modules, "Modules assembled");
    modules
}
