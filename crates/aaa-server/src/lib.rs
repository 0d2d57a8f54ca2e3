//! AAA Control Plane Server
//!
//! The authorization control plane of a federated data exchange:
//! - Manages policies granting consumers access to catalogue items
//! - Answers access checks against live policy state
//! - Issues short-lived signed access tokens bounded by those policies
//! - Verifies tokens locally, or with live introspection to honour revocation
//!
//! ## Invariants
//!
//! 1. At most one ACTIVE policy per (owner, consumer, resource)
//! 2. A revoke is visible to every later check
//! 3. Token constraints and lifetime never exceed the backing policy
//!
//! ## API Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check (policy store reachable)
//! - `POST /v1/policies` - Create a batch of policies
//! - `GET /v1/policies` - List policies for an owner or consumer
//! - `POST /v1/policies/verify` - Check access for a consumer, resource and action
//! - `POST /v1/policies/revoke` - Revoke by id or filter
//! - `POST /v1/tokens` - Issue an access token
//! - `POST /v1/tokens/verify` - Verify a token locally
//! - `POST /v1/tokens/introspect` - Verify a token and re-check its policy
//! - `GET /v1/keys/verification` - Public key for resource servers

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod keys;
pub mod storage;

pub use api::create_router;
pub use api::handlers::AppState;
pub use bootstrap::build_state;
pub use config::ServerConfig;
pub use core::{IssuedToken, PolicyEngine, TokenIssuer, TokenSettings, TokenVerifier};
pub use keys::KeyMaterial;
pub use storage::{MemoryStore, PolicyStore, StorageError};
