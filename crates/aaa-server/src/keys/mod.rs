//! Key material for token signing
//!
//! The signing key lives in a passphrase-sealed file and is loaded once at
//! process start. Failure to load is fatal.

pub mod keystore;
pub mod material;

pub use keystore::{KdfParams, KeyStoreError, SealedKeyFile};
pub use material::KeyMaterial;
