// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod cipher;
pub mod integration;
pub mod remote;

pub use activity::ActivityImporter;
pub use cipher::TokenCipher;
pub use integration::IntegrationService;
pub use remote::{CallOptions, HttpMethod, RemoteClient, RemoteResponse, RemoteServices};
