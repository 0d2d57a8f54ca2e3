//! In-memory storage backend
//!
//! Default storage implementation using an in-memory hashmap.
//! Suitable for development and single-instance deployments.
//! Data is lost on restart.

use aaa_core::{Policy, PolicyFilter, PolicyPage, PolicyStatus, RevokeTarget};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};
use uuid::Uuid;

use super::{PolicyStore, StorageError};

/// In-memory policy store implementation
///
/// Writers are serialized on one lock, which makes the uniqueness check and
/// the insert a single atomic step.
#[derive(Debug, Default)]
pub struct MemoryStore {
    policies: RwLock<HashMap<Uuid, Policy>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, Policy>>, StorageError> {
        self.policies
            .read()
            .map_err(|_| StorageError::Internal("policy lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, Policy>>, StorageError> {
        self.policies
            .write()
            .map_err(|_| StorageError::Internal("policy lock poisoned".into()))
    }

    /// Number of records in any status
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.read()?.is_empty())
    }
}

fn mark_revoked(policy: &mut Policy, now: DateTime<Utc>) {
    policy.status = PolicyStatus::Revoked;
    policy.revoked_at = Some(now);
}

fn by_creation(a: &Policy, b: &Policy) -> std::cmp::Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

#[async_trait]
impl PolicyStore for MemoryStore {
    // =========================================================================
    // Writes
    // =========================================================================

    async fn insert(&self, policy: &Policy, now: DateTime<Utc>) -> Result<(), StorageError> {
        let mut policies = self.write()?;

        let mut blocking = None;
        for existing in policies.values_mut().filter(|p| p.same_triple(policy)) {
            if existing.status != PolicyStatus::Active {
                continue;
            }
            if existing.is_elapsed(now) {
                debug!(policy_id = %existing.id, "Materializing expired policy");
                existing.status = PolicyStatus::Expired;
            } else {
                blocking = Some(existing.id);
            }
        }

        if let Some(existing) = blocking {
            return Err(StorageError::AlreadyExists(format!(
                "policy {} already grants '{}' access to '{}'",
                existing, policy.consumer_id, policy.resource_id
            )));
        }

        if policies.contains_key(&policy.id) {
            return Err(StorageError::AlreadyExists(format!("policy id {}", policy.id)));
        }

        info!(policy_id = %policy.id, "Storing policy");
        policies.insert(policy.id, policy.clone());
        Ok(())
    }

    async fn revoke(
        &self,
        target: &RevokeTarget,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, StorageError> {
        let mut policies = self.write()?;

        match target {
            RevokeTarget::Id(id) => {
                let policy = policies
                    .get_mut(id)
                    .filter(|p| p.is_active_at(now))
                    .ok_or_else(|| StorageError::NotFound(format!("no active policy {}", id)))?;
                mark_revoked(policy, now);
                Ok(vec![*id])
            }
            RevokeTarget::Filter(filter) => {
                let mut matched: Vec<&mut Policy> = policies
                    .values_mut()
                    .filter(|p| p.is_active_at(now) && filter_matches_ignoring_status(filter, p, now))
                    .collect();
                matched.sort_by(|a, b| by_creation(a, b));

                Ok(matched
                    .into_iter()
                    .map(|p| {
                        mark_revoked(p, now);
                        p.id
                    })
                    .collect())
            }
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    async fn get(&self, id: Uuid) -> Result<Option<Policy>, StorageError> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn find_active(
        &self,
        consumer_id: &str,
        resource_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Policy>, StorageError> {
        let policies = self.read()?;
        let mut found: Vec<Policy> = policies
            .values()
            .filter(|p| {
                p.consumer_id == consumer_id && p.resource_id == resource_id && p.is_active_at(now)
            })
            .cloned()
            .collect();
        found.sort_by(by_creation);
        Ok(found)
    }

    async fn list(
        &self,
        filter: &PolicyFilter,
        offset: u32,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<PolicyPage, StorageError> {
        let policies = self.read()?;
        let mut matched: Vec<&Policy> = policies.values().filter(|p| filter.matches(p, now)).collect();
        matched.sort_by(|a, b| by_creation(a, b));

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|p| {
                let mut item = p.clone();
                item.status = p.effective_status(now);
                item
            })
            .collect();

        Ok(PolicyPage {
            items,
            total,
            offset,
            limit,
        })
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.read().map(|_| ())
    }
}

/// Revoke only ever touches ACTIVE records, so a status filter is moot
fn filter_matches_ignoring_status(filter: &PolicyFilter, policy: &Policy, now: DateTime<Utc>) -> bool {
    let without_status = PolicyFilter {
        status: None,
        ..filter.clone()
    };
    without_status.matches(policy, now)
}
