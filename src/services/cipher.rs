// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token encryption at rest.
//!
//! AES-256-GCM with a key derived from the configured secret via
//! HKDF-SHA256. The account address is bound as additional authenticated
//! data, so a ciphertext copied onto another account fails to decrypt.
//! Stored form is base64 of `nonce || ciphertext || tag`.

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hkdf::Hkdf;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;

const HKDF_SALT: &[u8] = b"reward-runtime/token-encryption";
const HKDF_INFO: &[u8] = b"aes-256-gcm";

/// Encrypts and decrypts OAuth tokens.
#[derive(Clone)]
pub struct TokenCipher {
    key: [u8; 32],
    rng: SystemRandom,
}

impl TokenCipher {
    /// Derive the encryption key from `secret`.
    pub fn new(secret: &[u8]) -> Result<Self, AppError> {
        if secret.is_empty() {
            return Err(AppError::InvalidArgument(
                "Token encryption secret must not be empty".to_string(),
            ));
        }

        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), secret);
        let mut key = [0u8; 32];
        hk.expand(HKDF_INFO, &mut key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HKDF expand failed: {}", e)))?;

        Ok(Self {
            key,
            rng: SystemRandom::new(),
        })
    }

    fn aead_key(&self) -> Result<LessSafeKey, AppError> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.key)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid AES-256-GCM key")))?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Encrypt `plaintext` bound to `aad`, returning base64.
    pub fn encrypt(&self, plaintext: &str, aad: &[u8]) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.aead_key()?
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(aad),
                &mut in_out,
            )
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Token encryption failed")))?;

        let mut out = Vec::with_capacity(NONCE_LEN + in_out.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&in_out);
        Ok(BASE64.encode(out))
    }

    /// Decrypt base64 ciphertext produced by [`TokenCipher::encrypt`].
    pub fn decrypt(&self, encoded: &str, aad: &[u8]) -> Result<String, AppError> {
        let data = BASE64
            .decode(encoded)
            .map_err(|e| AppError::Runtime(format!("Malformed encrypted token: {}", e)))?;
        if data.len() < NONCE_LEN {
            return Err(AppError::Runtime("Encrypted token too short".to_string()));
        }

        let (nonce_bytes, sealed) = data.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| AppError::Runtime("Invalid token nonce".to_string()))?;

        let mut buf = sealed.to_vec();
        let plaintext = self
            .aead_key()?
            .open_in_place(nonce, Aad::from(aad), &mut buf)
            .map_err(|_| AppError::Runtime("Token decryption failed".to_string()))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|e| AppError::Runtime(format!("Decrypted token is not UTF-8: {}", e)))
    }

    /// Encrypt an access/refresh token pair for `address`.
    pub fn encrypt_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
        address: &str,
    ) -> Result<(String, String), AppError> {
        Ok((
            self.encrypt(access_token, address.as_bytes())?,
            self.encrypt(refresh_token, address.as_bytes())?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_with_aad() {
        let cipher = TokenCipher::new(b"secret").unwrap();
        let sealed = cipher.encrypt("access-token", b"0xabc").unwrap();

        assert_ne!(sealed, "access-token");
        assert_eq!(cipher.decrypt(&sealed, b"0xabc").unwrap(), "access-token");
    }

    #[test]
    fn test_wrong_aad_fails() {
        let cipher = TokenCipher::new(b"secret").unwrap();
        let sealed = cipher.encrypt("access-token", b"0xabc").unwrap();

        assert!(matches!(
            cipher.decrypt(&sealed, b"0xdef"),
            Err(AppError::Runtime(_))
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = TokenCipher::new(b"secret")
            .unwrap()
            .encrypt("token", b"0xabc")
            .unwrap();
        let other = TokenCipher::new(b"other").unwrap();
        assert!(other.decrypt(&sealed, b"0xabc").is_err());
    }

    #[test]
    fn test_nonce_is_random() {
        let cipher = TokenCipher::new(b"secret").unwrap();
        let a = cipher.encrypt("token", b"x").unwrap();
        let b = cipher.encrypt("token", b"x").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(TokenCipher::new(b"").is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let cipher = TokenCipher::new(b"secret").unwrap();
        assert!(cipher.decrypt("not base64!!", b"x").is_err());
        assert!(cipher.decrypt("AAAA", b"x").is_err());
    }
}
