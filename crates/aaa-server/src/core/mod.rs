//! Core logic for the control plane

pub mod engine;
pub mod issuer;
mod validation;
pub mod verifier;

pub use engine::PolicyEngine;
pub use issuer::{IssuedToken, TokenIssuer, TokenSettings};
pub use validation::{validate_batch, validate_grant, validate_grant_fields, validate_scope};
pub use verifier::TokenVerifier;
