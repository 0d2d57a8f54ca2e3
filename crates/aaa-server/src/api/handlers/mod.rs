//! API request handlers

pub mod keys;
pub mod policy;
pub mod token;

use aaa_catalogue::CatalogueResolver;
use std::sync::Arc;

use crate::core::{PolicyEngine, TokenIssuer, TokenSettings, TokenVerifier};
use crate::keys::KeyMaterial;
use crate::storage::PolicyStore;

pub use keys::{verification_key, VerificationKeyResponse};
pub use policy::{
    create_policies, list_policies, revoke_policies, verify_policy, CreatePoliciesRequest,
    CreatePoliciesResponse, ListPoliciesParams, RevokeRequest, RevokeResponse, VerifyPolicyRequest,
};
pub use token::{
    introspect_token, issue_token, verify_token, IssueTokenRequest, TokenRequest, TokenResponse,
};

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    /// Policy engine (create / verify / revoke / list)
    pub engine: Arc<PolicyEngine>,
    /// Token issuer
    pub issuer: TokenIssuer,
    /// Token verifier
    pub verifier: TokenVerifier,
    /// Signing key material
    pub keys: Arc<KeyMaterial>,
}

impl AppState {
    /// Wire the engine, issuer and verifier over shared collaborators
    pub fn new(
        store: Arc<dyn PolicyStore>,
        catalogue: Arc<dyn CatalogueResolver>,
        keys: Arc<KeyMaterial>,
        settings: TokenSettings,
    ) -> Self {
        let engine = Arc::new(PolicyEngine::new(store, catalogue));
        let verifier = TokenVerifier::new(
            Arc::clone(&engine),
            keys.verification_key(),
            settings.issuer(),
        );
        let issuer = TokenIssuer::new(Arc::clone(&engine), Arc::clone(&keys), settings);

        Self {
            engine,
            issuer,
            verifier,
            keys,
        }
    }
}
