//! # AAA Core
//!
//! Core types and token primitives for a federated authorization control
//! plane. Providers grant consumers access to catalogue items; the control
//! plane answers access checks and mints short-lived signed access tokens.
//!
//! ## Key Concepts
//!
//! - **Policy**: A persisted grant from an owner to a consumer over a resource
//! - **Constraints**: Typed, per-kind limits on what a grant allows
//! - **Access token**: A COSE_Sign1 signed claim set derived from one policy
//!
//! ## Invariants
//!
//! 1. At most one ACTIVE policy exists per (owner, consumer, resource)
//! 2. Token constraints never exceed the constraints of the source policy
//! 3. Status only moves forward: ACTIVE -> REVOKED or ACTIVE -> EXPIRED

pub mod claims;
pub mod constraints;
pub mod crypto;
pub mod error;
pub mod policy;
pub mod types;

pub use claims::TokenClaims;
pub use constraints::{Constraint, Constraints, ScopeViolation, ACCESS_ACTION, ANY_ACTION};
pub use crypto::{CryptoError, KeyPair, PublicKey, SerializablePublicKey, SignedClaims};
pub use error::{AaaError, ErrorKind, Result};
pub use policy::{
    GrantOutcome, GrantRequest, GrantStatus, ListQuery, Party, Policy, PolicyDecision,
    PolicyFilter, PolicyPage, RevokeOutcome, RevokeTarget, DEFAULT_PAGE_SIZE, MAX_BATCH_SIZE,
    MAX_PAGE_SIZE,
};
pub use types::{Identity, PolicyStatus, ResourceDescriptor, ResourceType, Role};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
