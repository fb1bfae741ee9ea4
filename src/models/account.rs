// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Account model for storage.

use crate::error::AppError;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

/// Length of generated referral codes.
pub const REFERRAL_CODE_LEN: usize = 8;

/// Unambiguous uppercase alphabet (no 0/O, 1/I).
const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Account stored in the `accounts` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Wallet address (also used as document ID)
    pub address: String,
    /// Code this account hands out to others
    #[serde(default)]
    pub referral_code: Option<String>,
    /// Referral code of the account that referred this one
    #[serde(default)]
    pub referred_by: Option<String>,
    /// When the account was created (ISO 8601)
    pub created_at: String,
}

impl Account {
    /// New account with a fresh referral code.
    pub fn new(address: &str, now: &str) -> Result<Self, AppError> {
        Ok(Self {
            address: address.to_string(),
            referral_code: Some(generate_referral_code()?),
            referred_by: None,
            created_at: now.to_string(),
        })
    }
}

/// Generate a random referral code.
pub fn generate_referral_code() -> Result<String, AppError> {
    let mut bytes = [0u8; REFERRAL_CODE_LEN];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;

    Ok(bytes
        .iter()
        .map(|b| REFERRAL_ALPHABET[*b as usize % REFERRAL_ALPHABET.len()] as char)
        .collect())
}
