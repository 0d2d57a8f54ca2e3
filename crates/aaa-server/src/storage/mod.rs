//! Storage abstraction for policy records
//!
//! This module provides a trait-based abstraction for the policy store,
//! enabling both in-memory (default) and persistent (PostgreSQL) backends.
//!
//! Every backend must uphold the same guarantees:
//! - At most one effectively ACTIVE record per (owner, consumer, resource)
//! - Elapsed ACTIVE records never block a new grant for the same triple
//! - A revoke is a single write, visible to every later read

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use aaa_core::{AaaError, Policy, PolicyFilter, PolicyPage, RevokeTarget};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use uuid::Uuid;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Policy not found: {0}")]
    NotFound(String),

    #[error("Active policy already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl From<StorageError> for AaaError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => AaaError::NotFound(msg),
            StorageError::AlreadyExists(msg) => AaaError::Conflict(msg),
            StorageError::Database(msg)
            | StorageError::Connection(msg)
            | StorageError::Internal(msg) => AaaError::Store(msg),
            StorageError::Serialization(msg) => AaaError::Store(format!("corrupt record: {}", msg)),
        }
    }
}

/// Storage backend trait for policy records
///
/// Implementations must be thread-safe and support concurrent access.
/// Every read takes the evaluation instant so that expiry is judged
/// consistently within one operation.
#[async_trait]
pub trait PolicyStore: Send + Sync + Debug {
    // =========================================================================
    // Writes
    // =========================================================================

    /// Persist a new ACTIVE policy
    ///
    /// Elapsed ACTIVE records for the same triple are first moved to
    /// EXPIRED in the same write. Fails with `AlreadyExists` if an
    /// effectively ACTIVE record for the triple remains.
    async fn insert(&self, policy: &Policy, now: DateTime<Utc>) -> Result<(), StorageError>;

    /// Move matching effectively ACTIVE records to REVOKED
    ///
    /// Returns the ids that changed. `RevokeTarget::Id` naming an unknown
    /// or non-active record fails with `NotFound`.
    async fn revoke(
        &self,
        target: &RevokeTarget,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, StorageError>;

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a policy by id, with its stored status
    async fn get(&self, id: Uuid) -> Result<Option<Policy>, StorageError>;

    /// Effectively ACTIVE policies granting `consumer_id` access to `resource_id`
    async fn find_active(
        &self,
        consumer_id: &str,
        resource_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Policy>, StorageError>;

    /// One page of policies matching `filter`, ordered by `created_at`
    ///
    /// Returned records carry their effective status at `now`.
    async fn list(
        &self,
        filter: &PolicyFilter,
        offset: u32,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<PolicyPage, StorageError>;

    /// Check the backend is reachable
    async fn ping(&self) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use aaa_core::ErrorKind;

    #[test]
    fn test_storage_errors_map_to_kinds() {
        let cases = [
            (StorageError::NotFound("x".into()), ErrorKind::NotFound),
            (StorageError::AlreadyExists("x".into()), ErrorKind::Conflict),
            (StorageError::Connection("x".into()), ErrorKind::Store),
            (StorageError::Internal("x".into()), ErrorKind::Store),
            (StorageError::Serialization("x".into()), ErrorKind::Store),
        ];

        for (err, kind) in cases {
            assert_eq!(AaaError::from(err).kind(), kind);
        }
    }
}
