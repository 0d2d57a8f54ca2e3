//! Policy Engine
//!
//! Creates, verifies, revokes and lists policies. All persistence goes
//! through a `PolicyStore`; all catalogue knowledge comes from a
//! `CatalogueResolver`.

use aaa_catalogue::{CatalogueError, CatalogueResolver};
use aaa_core::{
    AaaError, GrantOutcome, GrantRequest, ListQuery, Party, Policy, PolicyDecision, PolicyPage,
    ResourceDescriptor, ResourceType, Result, RevokeOutcome, RevokeTarget, ACCESS_ACTION,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::validation::{validate_batch, validate_grant, validate_grant_fields};
use crate::storage::PolicyStore;

/// The policy engine
///
/// Cheap to share; holds only `Arc`s to its collaborators.
#[derive(Clone)]
pub struct PolicyEngine {
    store: Arc<dyn PolicyStore>,
    catalogue: Arc<dyn CatalogueResolver>,
}

impl std::fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("store", &self.store)
            .field("catalogue", &self.catalogue.description())
            .finish()
    }
}

impl PolicyEngine {
    pub fn new(store: Arc<dyn PolicyStore>, catalogue: Arc<dyn CatalogueResolver>) -> Self {
        Self { store, catalogue }
    }

    // =========================================================================
    // create_policy
    // =========================================================================

    /// Create one policy per grant, owned by `owner_id`
    ///
    /// Each grant is judged independently and its outcome reported in
    /// order. A store or catalogue outage aborts the call; grants processed
    /// before the outage stay committed.
    pub async fn create_policy(
        &self,
        owner_id: &str,
        grants: Vec<GrantRequest>,
    ) -> Result<Vec<GrantOutcome>> {
        self.create_policy_at(owner_id, grants, Utc::now()).await
    }

    pub async fn create_policy_at(
        &self,
        owner_id: &str,
        grants: Vec<GrantRequest>,
        now: DateTime<Utc>,
    ) -> Result<Vec<GrantOutcome>> {
        validate_batch(owner_id, grants.len())?;

        let mut outcomes = Vec::with_capacity(grants.len());
        for grant in grants {
            let outcome = match self.create_one(owner_id, &grant, now).await {
                Ok(policy_id) => GrantOutcome::success(grant, policy_id),
                Err(e) if e.kind().is_retryable() => {
                    error!(
                        owner_id = %owner_id,
                        completed = outcomes.len(),
                        error = %e,
                        "Policy creation aborted"
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        owner_id = %owner_id,
                        consumer_id = %grant.consumer_id,
                        resource_id = %grant.resource_id,
                        code = %e.kind(),
                        reason = %e.message(),
                        "Grant rejected"
                    );
                    GrantOutcome::failed(grant, &e)
                }
            };
            outcomes.push(outcome);
        }

        let created = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            owner_id = %owner_id,
            requested = outcomes.len(),
            created,
            "Processed policy batch"
        );

        Ok(outcomes)
    }

    async fn create_one(
        &self,
        owner_id: &str,
        grant: &GrantRequest,
        now: DateTime<Utc>,
    ) -> Result<Uuid> {
        validate_grant_fields(grant)?;

        let item = self.catalogue.resolve(&grant.resource_id).await?;
        validate_grant(owner_id, grant, &item, now)?;

        let policy = Policy::new_active(
            owner_id,
            &grant.consumer_id,
            &grant.resource_id,
            item.resource_type,
            grant.constraints.clone(),
            grant.expires_at,
            now,
        );
        self.store.insert(&policy, now).await?;

        info!(
            policy_id = %policy.id,
            owner_id = %owner_id,
            consumer_id = %policy.consumer_id,
            resource_id = %policy.resource_id,
            resource_type = %policy.resource_type,
            "Created policy"
        );
        Ok(policy.id)
    }

    // =========================================================================
    // verify_policy
    // =========================================================================

    /// Decide whether `consumer_id` may perform `action` on `resource_id`
    ///
    /// Looks for a policy on the item itself, then on the item's resource
    /// group, then on the item's provider. Denies when nothing matches or
    /// the item is unknown.
    pub async fn verify_policy(
        &self,
        consumer_id: &str,
        resource_id: &str,
        action: &str,
    ) -> Result<PolicyDecision> {
        self.verify_policy_at(consumer_id, resource_id, action, Utc::now())
            .await
    }

    pub async fn verify_policy_at(
        &self,
        consumer_id: &str,
        resource_id: &str,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<PolicyDecision> {
        if consumer_id.trim().is_empty() || resource_id.trim().is_empty() {
            return Ok(PolicyDecision::deny());
        }

        if let Some(policy) = self
            .find_admitting(consumer_id, resource_id, action, now, |_| true)
            .await?
        {
            return Ok(allow(&policy, consumer_id, resource_id, action));
        }

        let item = match self.catalogue.resolve(resource_id).await {
            Ok(item) => item,
            Err(CatalogueError::NotFound(_)) => {
                return Ok(deny(consumer_id, resource_id, action, "unknown resource"))
            }
            Err(e) => return Err(AaaError::from(e)),
        };

        if let Some(group_id) = &item.group_id {
            let matched = self
                .find_admitting(consumer_id, group_id, action, now, |p| {
                    covers(p, &item, ResourceType::ResourceGroup)
                })
                .await?;
            if let Some(policy) = matched {
                return Ok(allow(&policy, consumer_id, resource_id, action));
            }
        }

        if item.resource_type != ResourceType::Provider {
            let matched = self
                .find_admitting(consumer_id, &item.provider_id, action, now, |p| {
                    covers(p, &item, ResourceType::Provider)
                })
                .await?;
            if let Some(policy) = matched {
                return Ok(allow(&policy, consumer_id, resource_id, action));
            }
        }

        Ok(deny(consumer_id, resource_id, action, "no matching policy"))
    }

    /// First effectively ACTIVE policy on `resource_id` that passes `accept`
    /// and admits `action`
    async fn find_admitting<F>(
        &self,
        consumer_id: &str,
        resource_id: &str,
        action: &str,
        now: DateTime<Utc>,
        accept: F,
    ) -> Result<Option<Policy>>
    where
        F: Fn(&Policy) -> bool + Send,
    {
        let candidates = self.store.find_active(consumer_id, resource_id, now).await?;
        Ok(candidates
            .into_iter()
            .find(|p| accept(p) && p.constraints.admits(action, now)))
    }

    /// The policy `policy_id` if it still lets `consumer_id` in at `now`
    ///
    /// Judges that one record only; a newer or more specific grant for the
    /// same consumer does not displace it.
    pub async fn policy_in_force_at(
        &self,
        policy_id: Uuid,
        consumer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Policy>> {
        let Some(policy) = self.store.get(policy_id).await? else {
            return Ok(None);
        };

        let in_force = policy.consumer_id == consumer_id
            && policy.is_active_at(now)
            && policy.constraints.admits(ACCESS_ACTION, now);
        Ok(in_force.then_some(policy))
    }

    // =========================================================================
    // revoke
    // =========================================================================

    /// Revoke one policy by id, or every ACTIVE policy matching a filter
    pub async fn revoke(&self, target: RevokeTarget) -> Result<RevokeOutcome> {
        self.revoke_at(target, Utc::now()).await
    }

    pub async fn revoke_at(&self, target: RevokeTarget, now: DateTime<Utc>) -> Result<RevokeOutcome> {
        if let RevokeTarget::Filter(filter) = &target {
            if filter.is_empty() {
                return Err(AaaError::Validation(
                    "revoke filter must name at least one field".into(),
                ));
            }
        }

        let revoked = self.store.revoke(&target, now).await?;

        info!(count = revoked.len(), ids = ?revoked, "Revoked policies");
        Ok(RevokeOutcome { revoked })
    }

    // =========================================================================
    // list_policies
    // =========================================================================

    /// One page of the policies an owner granted or a consumer holds
    pub async fn list_policies(&self, query: &ListQuery) -> Result<PolicyPage> {
        self.list_policies_at(query, Utc::now()).await
    }

    pub async fn list_policies_at(&self, query: &ListQuery, now: DateTime<Utc>) -> Result<PolicyPage> {
        let (Party::Owner(party_id) | Party::Consumer(party_id)) = &query.party;
        if party_id.trim().is_empty() {
            return Err(AaaError::Validation(
                "owner or consumer id cannot be empty".into(),
            ));
        }

        let page = self
            .store
            .list(&query.effective_filter(), query.offset, query.clamped_limit(), now)
            .await?;
        Ok(page)
    }

    /// Check the store is reachable
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await.map_err(AaaError::from)
    }
}

/// Whether `policy` is a grant of `level` over the item's group or provider
fn covers(policy: &Policy, item: &ResourceDescriptor, level: ResourceType) -> bool {
    policy.resource_type == level && policy.owner_id == item.provider_id
}

fn allow(policy: &Policy, consumer_id: &str, resource_id: &str, action: &str) -> PolicyDecision {
    info!(
        policy_id = %policy.id,
        consumer_id = %consumer_id,
        resource_id = %resource_id,
        granted_on = %policy.resource_id,
        action = %action,
        "Access allowed"
    );
    PolicyDecision::allow(policy)
}

fn deny(consumer_id: &str, resource_id: &str, action: &str, reason: &str) -> PolicyDecision {
    warn!(
        consumer_id = %consumer_id,
        resource_id = %resource_id,
        action = %action,
        reason,
        "Access denied"
    );
    PolicyDecision::deny()
}
