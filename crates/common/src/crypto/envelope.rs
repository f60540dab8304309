//! Authenticated token envelopes using ChaCha20-Poly1305
//!
//! An envelope carries a small `{key: value}` map plus a `valid` expiration
//! timestamp. The token type ("Session", "WWW-Authenticate", ...) is mixed
//! into the AEAD as associated data, so a token minted for one use cannot be
//! replayed as another. The wire form is
//! `base64url(nonce (12 bytes) || ciphertext || tag (16 bytes))`.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Errors that can occur sealing or opening an envelope
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("envelope error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("token expired")]
    Expired,
}

/// Server key material for envelopes
///
/// Holds the AEAD key plus a salt that callers may fold into token values
/// (the nonce challenge does this to bind tokens to a server instance).
/// Both are generated fresh at startup unless supplied.
#[derive(Clone)]
pub struct Keyring {
    key: [u8; KEY_SIZE],
    salt: [u8; KEY_SIZE],
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring").finish_non_exhaustive()
    }
}

impl Keyring {
    /// Generate a new keyring using a cryptographically secure RNG
    pub fn generate() -> Self {
        let mut key = [0; KEY_SIZE];
        getrandom::getrandom(&mut key).expect("failed to generate random bytes");
        let mut salt = [0; KEY_SIZE];
        getrandom::getrandom(&mut salt).expect("failed to generate random bytes");
        Self { key, salt }
    }

    /// Build a keyring from fixed key material
    pub fn from_bytes(key: [u8; KEY_SIZE], salt: [u8; KEY_SIZE]) -> Self {
        Self { key, salt }
    }

    /// Instance salt, folded into challenge tokens
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Seal `values` into a token valid for `validity` from now
    pub fn seal(
        &self,
        token_type: &str,
        values: &BTreeMap<String, String>,
        validity: Duration,
    ) -> Result<String, EnvelopeError> {
        let valid = unix_now() + validity.as_secs() as i64;
        self.seal_until(token_type, values, valid)
    }

    fn seal_until(
        &self,
        token_type: &str,
        values: &BTreeMap<String, String>,
        valid: i64,
    ) -> Result<String, EnvelopeError> {
        let mut values = values.clone();
        values.insert("valid".to_string(), valid.to_string());
        let plaintext = serde_json::to_vec(&values)
            .map_err(|e| anyhow::anyhow!("failed to encode token values: {}", e))?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: &plaintext,
                    aad: token_type.as_bytes(),
                },
            )
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(ciphertext.as_ref());

        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    /// Open a token, verifying authenticity, type and expiry
    pub fn open(
        &self,
        token_type: &str,
        token: &str,
    ) -> Result<BTreeMap<String, String>, EnvelopeError> {
        let data = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| anyhow::anyhow!("bad token encoding: {}", e))?;
        if data.len() < NONCE_SIZE {
            return Err(anyhow::anyhow!("token too short for nonce").into());
        }

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let plaintext = cipher
            .decrypt(
                nonce,
                Payload {
                    msg: &data[NONCE_SIZE..],
                    aad: token_type.as_bytes(),
                },
            )
            .map_err(|_| anyhow::anyhow!("decrypt error"))?;

        let values: BTreeMap<String, String> = serde_json::from_slice(&plaintext)
            .map_err(|e| anyhow::anyhow!("bad token payload: {}", e))?;

        let valid: i64 = values
            .get("valid")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| anyhow::anyhow!("token has no validity timestamp"))?;
        if unix_now() > valid {
            return Err(EnvelopeError::Expired);
        }

        Ok(values)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
