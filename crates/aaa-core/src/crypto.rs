//! Token signing primitives
//!
//! Access tokens are COSE_Sign1 structures signed with Ed25519, carried as
//! URL-safe unpadded base64 so they fit in headers and query strings.
//!
//! Key types:
//! - `KeyPair`: Ed25519 key pair for signing
//! - `PublicKey`: Ed25519 public key for verification
//! - `SignedClaims`: COSE_Sign1 wrapped `TokenClaims`

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use coset::{iana, CborSerializable, CoseSign1, CoseSign1Builder, HeaderBuilder};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::claims::TokenClaims;

/// COSE algorithm identifier for EdDSA (Ed25519)
const EDDSA_ALG: iana::Algorithm = iana::Algorithm::EdDSA;

/// Errors from signing, verification and envelope encoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Signature verification failed: {0}")]
    Signature(String),

    #[error("Key ID mismatch: expected '{expected}', got '{actual}'")]
    KeyMismatch { expected: String, actual: String },

    #[error("Malformed token envelope: {0}")]
    Envelope(String),

    #[error("Missing payload")]
    MissingPayload,

    #[error("Invalid key material: {0}")]
    Key(String),
}

impl From<coset::CoseError> for CryptoError {
    fn from(err: coset::CoseError) -> Self {
        CryptoError::Envelope(format!("{:?}", err))
    }
}

/// Signed claim set (COSE_Sign1 wrapped)
#[derive(Debug, Clone)]
pub struct SignedClaims {
    cose: CoseSign1,
}

impl SignedClaims {
    /// Key ID from the protected header
    pub fn kid(&self) -> Option<String> {
        let kid = &self.cose.protected.header.key_id;
        if kid.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(kid).to_string())
        }
    }

    pub fn signature(&self) -> &[u8] {
        &self.cose.signature
    }

    /// Serialize to CBOR bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        self.cose.clone().to_vec().map_err(CryptoError::from)
    }

    /// Deserialize from CBOR bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let cose = CoseSign1::from_slice(bytes)?;
        Ok(Self { cose })
    }

    /// Encode as a bearer token string
    pub fn to_token(&self) -> Result<String, CryptoError> {
        Ok(URL_SAFE_NO_PAD.encode(self.to_bytes()?))
    }

    /// Decode a bearer token string
    pub fn from_token(token: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| CryptoError::Envelope(format!("invalid base64: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Decode the claims without checking the signature
    ///
    /// Use `PublicKey::verify_claims` for anything security relevant.
    pub fn unverified_claims(&self) -> Result<TokenClaims, CryptoError> {
        let payload = self.cose.payload.as_ref().ok_or(CryptoError::MissingPayload)?;
        TokenClaims::from_bytes(payload).map_err(|e| CryptoError::Envelope(e.to_string()))
    }
}

/// Ed25519 key pair for signing tokens
#[derive(Clone)]
pub struct KeyPair {
    kid: String,
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("kid", &self.kid)
            .field("signing_key", &"[redacted]")
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate(kid: impl Into<String>) -> Self {
        Self::from_signing_key(kid, SigningKey::generate(&mut OsRng))
    }

    pub fn from_signing_key(kid: impl Into<String>, signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            kid: kid.into(),
            signing_key,
            verifying_key,
        }
    }

    /// Rebuild a key pair from its 32-byte seed
    pub fn from_bytes(kid: impl Into<String>, bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(kid, SigningKey::from_bytes(bytes))
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            kid: self.kid.clone(),
            verifying_key: self.verifying_key,
        }
    }

    /// Raw 32-byte seed; handle with care
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Sign a claim set and wrap it in COSE_Sign1
    pub fn sign_claims(&self, claims: &TokenClaims) -> Result<SignedClaims, CryptoError> {
        let payload = claims
            .to_bytes()
            .map_err(|e| CryptoError::Envelope(e.to_string()))?;

        let protected = HeaderBuilder::new()
            .algorithm(EDDSA_ALG)
            .key_id(self.kid.as_bytes().to_vec())
            .build();

        let cose = CoseSign1Builder::new()
            .protected(protected)
            .payload(payload)
            .try_create_signature(&[], |data| {
                let signature = self.signing_key.sign(data);
                Ok::<_, CryptoError>(signature.to_bytes().to_vec())
            })?
            .build();

        Ok(SignedClaims { cose })
    }
}

/// Ed25519 public key for verification
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    kid: String,
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey").field("kid", &self.kid).finish()
    }
}

impl PublicKey {
    pub fn from_bytes(kid: impl Into<String>, bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(bytes).map_err(|e| CryptoError::Key(e.to_string()))?;
        Ok(Self {
            kid: kid.into(),
            verifying_key,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Verify a signed claim set and decode its payload
    pub fn verify_claims(&self, signed: &SignedClaims) -> Result<TokenClaims, CryptoError> {
        let cose = &signed.cose;

        let kid = &cose.protected.header.key_id;
        if !kid.is_empty() {
            let kid_str = String::from_utf8_lossy(kid);
            if kid_str != self.kid {
                return Err(CryptoError::KeyMismatch {
                    expected: self.kid.clone(),
                    actual: kid_str.to_string(),
                });
            }
        }

        let signature_bytes: [u8; 64] = cose
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::Signature("invalid signature length".into()))?;
        let signature = Signature::from_bytes(&signature_bytes);

        self.verifying_key
            .verify(&cose.tbs_data(&[]), &signature)
            .map_err(|e| CryptoError::Signature(e.to_string()))?;

        signed.unverified_claims()
    }
}

/// Serializable public key for publication to resource servers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializablePublicKey {
    pub kid: String,
    /// Base64-encoded public key bytes
    pub key: String,
    pub alg: String,
}

impl From<&PublicKey> for SerializablePublicKey {
    fn from(pk: &PublicKey) -> Self {
        use base64::engine::general_purpose::STANDARD;
        Self {
            kid: pk.kid.clone(),
            key: STANDARD.encode(pk.to_bytes()),
            alg: "EdDSA".into(),
        }
    }
}

impl TryFrom<SerializablePublicKey> for PublicKey {
    type Error = CryptoError;

    fn try_from(spk: SerializablePublicKey) -> Result<Self, CryptoError> {
        use base64::engine::general_purpose::STANDARD;
        let bytes = STANDARD
            .decode(&spk.key)
            .map_err(|e| CryptoError::Key(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::Key("invalid key length".into()))?;
        PublicKey::from_bytes(spk.kid, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{Constraint, Constraints};
    use crate::types::Role;
    use uuid::Uuid;

    fn claims() -> TokenClaims {
        TokenClaims {
            jti: Uuid::new_v4(),
            sub: "consumer-c".into(),
            iss: "auth.example.org".into(),
            iat: 1_700_000_000,
            exp: 1_700_000_300,
            rid: "rs/item-1".into(),
            pid: Uuid::new_v4(),
            role: Role::Consumer,
            constraints: Constraints::new().with(Constraint::actions(["read"])),
        }
    }

    #[test]
    fn test_sign_and_verify_claims() {
        let kp = KeyPair::generate("aaa-1");
        let signed = kp.sign_claims(&claims()).unwrap();

        assert_eq!(signed.kid().as_deref(), Some("aaa-1"));
        assert_eq!(signed.signature().len(), 64);

        let verified = kp.public_key().verify_claims(&signed).unwrap();
        assert_eq!(verified.sub, "consumer-c");
    }

    #[test]
    fn test_token_string_survives_transport() {
        let kp = KeyPair::generate("aaa-1");
        let original = claims();
        let token = kp.sign_claims(&original).unwrap().to_token().unwrap();

        assert!(!token.contains('='));
        let restored = SignedClaims::from_token(&token).unwrap();
        assert_eq!(kp.public_key().verify_claims(&restored).unwrap(), original);
    }

    #[test]
    fn test_verification_fails_with_wrong_key() {
        let signer = KeyPair::generate("aaa-1");
        let other = KeyPair::generate("aaa-1");

        let signed = signer.sign_claims(&claims()).unwrap();
        assert!(matches!(
            other.public_key().verify_claims(&signed),
            Err(CryptoError::Signature(_))
        ));
    }

    #[test]
    fn test_verification_fails_on_kid_mismatch() {
        let signer = KeyPair::generate("aaa-1");
        let signed = signer.sign_claims(&claims()).unwrap();

        let renamed = KeyPair::from_bytes("aaa-2", &signer.signing_key_bytes());
        assert!(matches!(
            renamed.public_key().verify_claims(&signed),
            Err(CryptoError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let kp = KeyPair::generate("aaa-1");
        let mut signed = kp.sign_claims(&claims()).unwrap();

        let mut forged = claims();
        forged.sub = "mallory".into();
        signed.cose.payload = Some(forged.to_bytes().unwrap());

        assert!(kp.public_key().verify_claims(&signed).is_err());
    }

    #[test]
    fn test_garbage_token_is_envelope_error() {
        assert!(matches!(
            SignedClaims::from_token("not a token!"),
            Err(CryptoError::Envelope(_))
        ));
    }

    #[test]
    fn test_public_key_serialization() {
        let pk = KeyPair::generate("aaa-1").public_key();
        let published: SerializablePublicKey = (&pk).into();
        let restored: PublicKey = published.try_into().unwrap();
        assert_eq!(restored, pk);
    }
}
