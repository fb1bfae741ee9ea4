// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed OAuth `state` parameter binding the account address.
//!
//! Format (before base64url): `address|timestamp_ms_hex|hmac_sha256_hex`.

use crate::error::AppError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// States older than this are rejected on callback.
pub const STATE_MAX_AGE_MS: i64 = 10 * 60 * 1000;

fn mac_hex(payload: &str, secret: &[u8]) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Sign `address` into an opaque state string.
pub fn sign_state(address: &str, secret: &[u8], now_ms: i64) -> Result<String, AppError> {
    if address.is_empty() || address.contains('|') {
        return Err(AppError::InvalidArgument(format!(
            "Invalid account address: {:?}",
            address
        )));
    }

    let payload = format!("{}|{:x}", address, now_ms);
    let signature = mac_hex(&payload, secret)?;
    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify a state string and return the bound address.
pub fn verify_state(state: &str, secret: &[u8], now_ms: i64) -> Result<String, AppError> {
    let invalid = || AppError::InvalidArgument("Invalid OAuth state".to_string());

    let bytes = URL_SAFE_NO_PAD.decode(state).map_err(|_| invalid())?;
    let decoded = String::from_utf8(bytes).map_err(|_| invalid())?;

    let parts: Vec<&str> = decoded.splitn(3, '|').collect();
    let [address, timestamp_hex, signature_hex] = parts.as_slice() else {
        return Err(invalid());
    };

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(format!("{}|{}", address, timestamp_hex).as_bytes());
    let signature = hex::decode(signature_hex).map_err(|_| invalid())?;
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return Err(invalid());
    }

    let issued_at = i64::from_str_radix(timestamp_hex, 16).map_err(|_| invalid())?;
    if now_ms - issued_at > STATE_MAX_AGE_MS || issued_at > now_ms + STATE_MAX_AGE_MS {
        return Err(AppError::InvalidArgument("OAuth state expired".to_string()));
    }

    Ok(address.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_767_225_600_000;

    #[test]
    fn test_state_roundtrip() {
        let state = sign_state("0xabc", b"key", NOW).unwrap();
        assert_eq!(verify_state(&state, b"key", NOW + 1000).unwrap(), "0xabc");
    }

    #[test]
    fn test_state_url_safe() {
        let state = sign_state("0xabc", b"key", NOW).unwrap();
        assert!(!state.contains('+'));
        assert!(!state.contains('/'));
        assert!(!state.contains('='));
    }

    #[test]
    fn test_state_wrong_secret() {
        let state = sign_state("0xabc", b"key", NOW).unwrap();
        assert!(verify_state(&state, b"other", NOW).is_err());
    }

    #[test]
    fn test_state_tampered_address() {
        let state = sign_state("0xabc", b"key", NOW).unwrap();
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();
        let forged = URL_SAFE_NO_PAD.encode(decoded.replacen("0xabc", "0xevil", 1));
        assert!(verify_state(&forged, b"key", NOW).is_err());
    }

    #[test]
    fn test_state_expired() {
        let state = sign_state("0xabc", b"key", NOW).unwrap();
        let result = verify_state(&state, b"key", NOW + STATE_MAX_AGE_MS + 1);
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_state_malformed() {
        assert!(verify_state("not-valid-base64!!!", b"key", NOW).is_err());
        let encoded = URL_SAFE_NO_PAD.encode("invalid|format");
        assert!(verify_state(&encoded, b"key", NOW).is_err());
    }

    #[test]
    fn test_address_with_separator_rejected() {
        assert!(sign_state("a|b", b"key", NOW).is_err());
        assert!(sign_state("", b"key", NOW).is_err());
    }
}
