// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod account;
pub mod activity;
pub mod integration;

pub use account::Account;
pub use activity::{Activity, PayoutState};
pub use integration::{IntegrationRecord, ProviderKind};
