//! Encoding of the pending request token for client-side storage.
//!
//! Format: `base64url(token) "." base64url(nonce || ciphertext)`, where the
//! ciphertext is the AES-256-GCM encryption of the token secret with the clear
//! token as associated data. `.` is outside the base64url alphabet, so neither
//! half can contain the delimiter, and swapping either half breaks the tag.

use crate::error::{OAuth1Error, OAuth1Result};
use crate::types::RequestToken;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;
const DELIMITER: char = '.';

/// Symmetric codec for [`RequestToken`]s.
///
/// The key is derived from a process-wide secret; rotating that secret makes
/// every in-flight handshake fail with [`OAuth1Error::StateCorrupted`].
#[derive(Clone)]
pub struct StateTokenCodec {
    key: [u8; 32],
}

impl StateTokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"OAUTH1_REQUEST_TOKEN:");
        hasher.update(secret.as_bytes());
        Self {
            key: hasher.finalize().into(),
        }
    }

    pub fn encode(&self, token: &RequestToken) -> OAuth1Result<String> {
        let cipher = Aes256Gcm::new(&self.key.into());
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: token.secret.as_bytes(),
                    aad: token.token.as_bytes(),
                },
            )
            .map_err(|e| OAuth1Error::StateCorrupted(format!("encryption failed: {}", e)))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        Ok(format!(
            "{}{}{}",
            URL_SAFE_NO_PAD.encode(token.token.as_bytes()),
            DELIMITER,
            URL_SAFE_NO_PAD.encode(&blob)
        ))
    }

    /// Decode a stored value. `None` in means "no pending state" and yields
    /// `None` out; anything that fails to decode or decrypt is an error.
    pub fn decode(&self, raw: Option<&str>) -> OAuth1Result<Option<RequestToken>> {
        let Some(raw) = raw else {
            return Ok(None);
        };

        let (token_part, secret_part) = raw
            .split_once(DELIMITER)
            .ok_or_else(|| OAuth1Error::StateCorrupted("missing delimiter".to_string()))?;

        let token_bytes = URL_SAFE_NO_PAD
            .decode(token_part)
            .map_err(|e| OAuth1Error::StateCorrupted(format!("invalid token encoding: {}", e)))?;
        let token = String::from_utf8(token_bytes)
            .map_err(|_| OAuth1Error::StateCorrupted("token is not UTF-8".to_string()))?;

        let blob = URL_SAFE_NO_PAD
            .decode(secret_part)
            .map_err(|e| OAuth1Error::StateCorrupted(format!("invalid secret encoding: {}", e)))?;
        if blob.len() <= NONCE_LEN {
            return Err(OAuth1Error::StateCorrupted("secret too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(&self.key.into());
        let secret = cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: token.as_bytes(),
                },
            )
            .map_err(|_| OAuth1Error::StateCorrupted("decryption failed".to_string()))?;
        let secret = String::from_utf8(secret)
            .map_err(|_| OAuth1Error::StateCorrupted("secret is not UTF-8".to_string()))?;

        Ok(Some(RequestToken { token, secret }))
    }
}
