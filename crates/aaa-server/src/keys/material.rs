//! Key Material Provider
//!
//! Holds the process-wide signing key. Loaded once at start and shared
//! read-only behind an `Arc`.

use aaa_core::{AaaError, KeyPair, PublicKey, Result, SerializablePublicKey};
use std::path::Path;
use tracing::{error, info};

use super::keystore::SealedKeyFile;

/// Signing and verification key material
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    key_pair: KeyPair,
}

impl KeyMaterial {
    /// Wrap an existing key pair
    pub fn from_key_pair(key_pair: KeyPair) -> Self {
        info!(kid = %key_pair.kid(), "Key material initialized");
        Self { key_pair }
    }

    /// Generate throwaway key material
    ///
    /// For tests and local development only; tokens do not survive a restart.
    pub fn generate(kid: impl Into<String>) -> Self {
        Self::from_key_pair(KeyPair::generate(kid))
    }

    /// Load and open the sealed key store at `path`
    ///
    /// Any failure is `FatalConfig`: the process must not serve without a key.
    pub fn load(path: impl AsRef<Path>, passphrase: &str) -> Result<Self> {
        let path = path.as_ref();
        let key_pair = SealedKeyFile::read_from(path)
            .and_then(|file| file.unseal(passphrase))
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "Failed to load signing key");
                AaaError::from(e)
            })?;

        info!(kid = %key_pair.kid(), path = %path.display(), "Loaded signing key");
        Ok(Self::from_key_pair(key_pair))
    }

    /// Key ID stamped on every token
    pub fn kid(&self) -> &str {
        self.key_pair.kid()
    }

    /// The signing key
    pub fn signing_key(&self) -> &KeyPair {
        &self.key_pair
    }

    /// The verification key
    pub fn verification_key(&self) -> PublicKey {
        self.key_pair.public_key()
    }

    /// The verification key in its published form
    pub fn published_key(&self) -> SerializablePublicKey {
        SerializablePublicKey::from(&self.verification_key())
    }
}
