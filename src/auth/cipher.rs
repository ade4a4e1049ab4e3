use super::credentials::Credentials;
use crate::error::AuthError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;
use tracing::warn;

const NONCE_LEN: usize = 12;
const KEY_SALT: &[u8] = b"sheetwise.credentials";
const KEY_INFO: &[u8] = b"aes-256-gcm v1";

/// AES-256-GCM over credential JSON; blobs are `ivHex:cipherHex`.
#[derive(Clone)]
pub struct CredentialCipher {
    key: Key<Aes256Gcm>,
    ephemeral: bool,
}

impl CredentialCipher {
    /// Derive the key from an operator-supplied secret with HKDF-SHA256.
    pub fn from_secret(secret: &str) -> Result<Self, AuthError> {
        if secret.trim().is_empty() {
            return Err(AuthError::Config(
                "auth.encryption_key must not be empty".to_string(),
            ));
        }
        let hk = Hkdf::<Sha256>::new(Some(KEY_SALT), secret.as_bytes());
        let mut okm = [0u8; 32];
        hk.expand(KEY_INFO, &mut okm)
            .map_err(|e| AuthError::Config(format!("key derivation failed: {e}")))?;
        Ok(Self {
            key: *Key::<Aes256Gcm>::from_slice(&okm),
            ephemeral: false,
        })
    }

    /// Random process-local key. Blobs written with it are unreadable after restart.
    pub fn generate() -> Self {
        let okm: [u8; 32] = rand::random();
        Self {
            key: *Key::<Aes256Gcm>::from_slice(&okm),
            ephemeral: true,
        }
    }

    /// Key from configuration; without one, only `dev_mode` may fall back to a generated key.
    pub fn resolve(secret: Option<&str>, dev_mode: bool) -> Result<Self, AuthError> {
        match secret {
            Some(secret) if !secret.trim().is_empty() => Self::from_secret(secret),
            _ if dev_mode => {
                warn!("!!! auth.encryption_key is not set: using a GENERATED credential key !!!");
                warn!("!!! stored credentials will be unreadable after restart; dev_mode only !!!");
                Ok(Self::generate())
            }
            _ => Err(AuthError::Config(
                "auth.encryption_key is required outside basic.dev_mode".to_string(),
            )),
        }
    }

    /// True for keys from [`CredentialCipher::generate`].
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, AuthError> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let ciphertext = Aes256Gcm::new(&self.key)
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| AuthError::Encryption(e.to_string()))?;
        Ok(format!(
            "{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(ciphertext)
        ))
    }

    pub fn decrypt(&self, blob: &str) -> Result<Vec<u8>, AuthError> {
        let (iv_hex, ct_hex) = blob
            .split_once(':')
            .ok_or_else(|| AuthError::Decryption("malformed blob".to_string()))?;
        let iv = hex::decode(iv_hex).map_err(|e| AuthError::Decryption(e.to_string()))?;
        if iv.len() != NONCE_LEN {
            return Err(AuthError::Decryption(format!(
                "iv must be {NONCE_LEN} bytes, got {}",
                iv.len()
            )));
        }
        let ciphertext = hex::decode(ct_hex).map_err(|e| AuthError::Decryption(e.to_string()))?;
        Aes256Gcm::new(&self.key)
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| AuthError::Decryption("authentication tag mismatch".to_string()))
    }

    pub fn encrypt_credentials(&self, creds: &Credentials) -> Result<String, AuthError> {
        let json = serde_json::to_vec(creds).map_err(|e| AuthError::Encryption(e.to_string()))?;
        self.encrypt(&json)
    }

    pub fn decrypt_credentials(&self, blob: &str) -> Result<Credentials, AuthError> {
        let json = self.decrypt(blob)?;
        serde_json::from_slice(&json).map_err(|e| AuthError::Decryption(e.to_string()))
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialCipher(<redacted>)")
    }
}
