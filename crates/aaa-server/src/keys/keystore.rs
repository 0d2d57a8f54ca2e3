//! Sealed key store file
//!
//! The Ed25519 seed is sealed with XChaCha20-Poly1305 under a key derived
//! from the passphrase with Argon2id and a random per-file salt. The key id
//! is bound as associated data, so a renamed file fails to open.
//!
//! File layout (JSON, binary fields in standard base64):
//! `{"version": 2, "kid": "...", "kdf": {"algorithm": "argon2id", "m_cost": ..,
//! "t_cost": .., "p_cost": ..}, "salt": "...", "nonce": "...", "sealed_key": "..."}`

use aaa_core::{AaaError, KeyPair};
use base64::{engine::general_purpose::STANDARD, Engine};
use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Current file format version
pub const KEYSTORE_VERSION: u32 = 2;

const KDF_ALGORITHM: &str = "argon2id";
const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;

/// Errors from reading, writing or opening a key store
#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("Key store I/O error: {0}")]
    Io(String),

    #[error("Malformed key store: {0}")]
    Malformed(String),

    #[error("Unsupported key store version: {0}")]
    UnsupportedVersion(u32),

    #[error("Key store passphrase is empty")]
    EmptyPassphrase,

    #[error("Key store could not be opened: wrong passphrase or tampered file")]
    WrongPassphrase,

    #[error("Key derivation failed: {0}")]
    Derivation(String),
}

impl From<KeyStoreError> for AaaError {
    fn from(err: KeyStoreError) -> Self {
        AaaError::FatalConfig(err.to_string())
    }
}

/// Argon2id cost parameters recorded alongside the sealed key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub algorithm: String,
    /// Memory in KiB
    pub m_cost: u32,
    /// Iterations
    pub t_cost: u32,
    /// Lanes
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            algorithm: KDF_ALGORITHM.to_string(),
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    fn derive_key(&self, passphrase: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], KeyStoreError> {
        if passphrase.is_empty() {
            return Err(KeyStoreError::EmptyPassphrase);
        }
        if self.algorithm != KDF_ALGORITHM {
            return Err(KeyStoreError::Malformed(format!(
                "unsupported kdf '{}'",
                self.algorithm
            )));
        }

        let params = Params::new(self.m_cost, self.t_cost, self.p_cost, Some(KEY_LEN))
            .map_err(|e| KeyStoreError::Derivation(e.to_string()))?;
        let mut key = [0u8; KEY_LEN];
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| KeyStoreError::Derivation(e.to_string()))?;
        Ok(key)
    }
}

/// On-disk representation of a sealed signing key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKeyFile {
    pub version: u32,
    pub kid: String,
    pub kdf: KdfParams,
    pub salt: String,
    pub nonce: String,
    pub sealed_key: String,
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, KeyStoreError> {
    STANDARD
        .decode(value)
        .map_err(|e| KeyStoreError::Malformed(format!("{}: {}", name, e)))
}

impl SealedKeyFile {
    /// Seal `key_pair` under `passphrase` with the default Argon2id costs
    pub fn seal(key_pair: &KeyPair, passphrase: &str) -> Result<Self, KeyStoreError> {
        Self::seal_with(key_pair, passphrase, KdfParams::default())
    }

    pub fn seal_with(
        key_pair: &KeyPair,
        passphrase: &str,
        kdf: KdfParams,
    ) -> Result<Self, KeyStoreError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        let key = kdf.derive_key(passphrase, &salt)?;
        let cipher = XChaCha20Poly1305::new((&key).into());
        let seed = key_pair.signing_key_bytes();

        let sealed = cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: &seed,
                    aad: key_pair.kid().as_bytes(),
                },
            )
            .map_err(|_| KeyStoreError::Derivation("sealing failed".into()))?;

        Ok(Self {
            version: KEYSTORE_VERSION,
            kid: key_pair.kid().to_string(),
            kdf,
            salt: STANDARD.encode(salt),
            nonce: STANDARD.encode(nonce),
            sealed_key: STANDARD.encode(sealed),
        })
    }

    /// Open the file with `passphrase`
    pub fn unseal(&self, passphrase: &str) -> Result<KeyPair, KeyStoreError> {
        if self.version != KEYSTORE_VERSION {
            return Err(KeyStoreError::UnsupportedVersion(self.version));
        }
        if self.kid.trim().is_empty() {
            return Err(KeyStoreError::Malformed("kid is empty".into()));
        }

        let salt = decode_field("salt", &self.salt)?;
        let nonce = decode_field("nonce", &self.nonce)?;
        let sealed = decode_field("sealed_key", &self.sealed_key)?;

        if nonce.len() != NONCE_LEN {
            return Err(KeyStoreError::Malformed(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LEN,
                nonce.len()
            )));
        }

        let key = self.kdf.derive_key(passphrase, &salt)?;
        let cipher = XChaCha20Poly1305::new((&key).into());

        let seed = cipher
            .decrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: &sealed,
                    aad: self.kid.as_bytes(),
                },
            )
            .map_err(|_| KeyStoreError::WrongPassphrase)?;

        let seed: [u8; 32] = seed
            .as_slice()
            .try_into()
            .map_err(|_| KeyStoreError::Malformed("sealed key is not an Ed25519 seed".into()))?;

        Ok(KeyPair::from_bytes(self.kid.clone(), &seed))
    }

    /// Read a key store file
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, KeyStoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| KeyStoreError::Io(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&json).map_err(|e| KeyStoreError::Malformed(e.to_string()))
    }

    /// Write the key store file, refusing to overwrite an existing one
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), KeyStoreError> {
        let path = path.as_ref();
        if path.exists() {
            return Err(KeyStoreError::Io(format!("{} already exists", path.display())));
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| KeyStoreError::Malformed(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| KeyStoreError::Io(format!("{}: {}", path.display(), e)))?;

        info!(kid = %self.kid, path = %path.display(), "Wrote sealed key store");
        Ok(())
    }
}
