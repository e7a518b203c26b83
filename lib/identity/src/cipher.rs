//! AES-256-GCM sealing for provider tokens stored at rest.
//!
//! A sealed value is `base64(nonce || ciphertext)` with a fresh random
//! 12-byte nonce per seal, so it fits in a text column.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rootcause::Report;
use std::fmt;

use crate::error::AuthError;

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;

/// An encrypted token as stored in the database.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedToken(String);

impl SealedToken {
    /// Wraps a value read back from storage.
    #[must_use]
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Returns the stored form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for SealedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealedToken(..)")
    }
}

/// Seals and opens provider tokens with a key loaded at startup.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// Builds a cipher from a base64-encoded 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the key is not valid base64 or
    /// does not decode to exactly 32 bytes.
    pub fn from_base64_key(encoded: &str) -> Result<Self, Report<AuthError>> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| AuthError::Configuration {
                details: format!("auth.token_encryption_key is not valid base64: {e}"),
            })?;
        if bytes.len() != KEY_SIZE {
            return Err(AuthError::Configuration {
                details: format!(
                    "auth.token_encryption_key must decode to {KEY_SIZE} bytes, got {}",
                    bytes.len()
                ),
            }
            .into());
        }
        let key = Key::<Aes256Gcm>::from_slice(&bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Encrypts a token under a fresh nonce.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Cipher` if encryption fails.
    pub fn seal(&self, plaintext: &str) -> Result<SealedToken, Report<AuthError>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| AuthError::Cipher {
                details: "encryption failed".to_string(),
            })?;

        let mut combined = nonce.to_vec();
        combined.extend(ciphertext);
        Ok(SealedToken(BASE64.encode(combined)))
    }

    /// Seals an optional token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Cipher` if encryption fails.
    pub fn seal_optional(
        &self,
        plaintext: Option<&str>,
    ) -> Result<Option<SealedToken>, Report<AuthError>> {
        plaintext.map(|p| self.seal(p)).transpose()
    }

    /// Decrypts a sealed token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Cipher` if the value is malformed, was sealed under
    /// another key, or has been tampered with.
    pub fn open(&self, sealed: &SealedToken) -> Result<String, Report<AuthError>> {
        let combined = BASE64.decode(&sealed.0).map_err(|e| AuthError::Cipher {
            details: format!("sealed token is not valid base64: {e}"),
        })?;
        if combined.len() < NONCE_SIZE {
            return Err(AuthError::Cipher {
                details: "sealed token is too short".to_string(),
            }
            .into());
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| AuthError::Cipher {
                details: "decryption failed".to_string(),
            })?;

        String::from_utf8(plaintext).map_err(|e| {
            AuthError::Cipher {
                details: format!("sealed token is not UTF-8: {e}"),
            }
            .into()
        })
    }
}

impl fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenCipher(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> String {
        BASE64.encode([byte; KEY_SIZE])
    }

    #[test]
    fn seal_then_open_returns_plaintext() {
        let cipher = TokenCipher::from_base64_key(&key(7)).expect("valid key");
        let sealed = cipher.seal("ya29.access-token").expect("seal");
        assert_ne!(sealed.as_str(), "ya29.access-token");
        assert_eq!(cipher.open(&sealed).expect("open"), "ya29.access-token");
    }

    #[test]
    fn sealing_twice_uses_different_nonces() {
        let cipher = TokenCipher::from_base64_key(&key(7)).expect("valid key");
        let a = cipher.seal("same").expect("seal");
        let b = cipher.seal("same").expect("seal");
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_cannot_open() {
        let sealed = TokenCipher::from_base64_key(&key(1))
            .expect("valid key")
            .seal("secret")
            .expect("seal");
        let other = TokenCipher::from_base64_key(&key(2)).expect("valid key");
        assert!(other.open(&sealed).is_err());
    }

    #[test]
    fn tampered_value_is_rejected() {
        let cipher = TokenCipher::from_base64_key(&key(3)).expect("valid key");
        let sealed = cipher.seal("secret").expect("seal");
        let mut bytes = BASE64.decode(sealed.as_str()).expect("base64");
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = SealedToken::from_stored(BASE64.encode(bytes));
        assert!(cipher.open(&tampered).is_err());
    }

    #[test]
    fn short_key_is_a_configuration_error() {
        assert!(TokenCipher::from_base64_key(&BASE64.encode([0u8; 16])).is_err());
        assert!(TokenCipher::from_base64_key("not base64!").is_err());
    }

    #[test]
    fn seal_optional_passes_none_through() {
        let cipher = TokenCipher::from_base64_key(&key(4)).expect("valid key");
        assert!(cipher.seal_optional(None).expect("seal").is_none());
        assert!(cipher.seal_optional(Some("t")).expect("seal").is_some());
    }
}
