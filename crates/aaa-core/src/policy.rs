//! Policy records and the request/response shapes of policy operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constraints::Constraints;
use crate::error::{AaaError, ErrorKind};
use crate::types::{PolicyStatus, ResourceType};

/// Largest number of grants accepted in one `create_policy` call
pub const MAX_BATCH_SIZE: usize = 100;

/// Largest page returned by a list call
pub const MAX_PAGE_SIZE: u32 = 500;

/// Page size used when the caller does not ask for one
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// A persisted grant of access from an owner to a consumer over a resource
///
/// Records are never deleted; `status` is the tombstone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,

    /// Grantor (provider) identity
    pub owner_id: String,

    /// Grantee identity
    pub consumer_id: String,

    /// Catalogue item the grant covers
    pub resource_id: String,

    pub resource_type: ResourceType,

    #[serde(default)]
    pub constraints: Constraints,

    pub status: PolicyStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Policy {
    /// Build a fresh ACTIVE policy
    pub fn new_active(
        owner_id: impl Into<String>,
        consumer_id: impl Into<String>,
        resource_id: impl Into<String>,
        resource_type: ResourceType,
        constraints: Constraints,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            consumer_id: consumer_id.into(),
            resource_id: resource_id.into(),
            resource_type,
            constraints,
            status: PolicyStatus::Active,
            expires_at,
            created_at: now,
            revoked_at: None,
        }
    }

    /// Whether the expiry has elapsed at `now`
    pub fn is_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |exp| exp <= now)
    }

    /// Status as observed at `now`
    ///
    /// An ACTIVE record whose expiry has passed reads as EXPIRED even before
    /// the transition is written.
    pub fn effective_status(&self, now: DateTime<Utc>) -> PolicyStatus {
        match self.status {
            PolicyStatus::Active if self.is_elapsed(now) => PolicyStatus::Expired,
            status => status,
        }
    }

    /// ACTIVE and not expired at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == PolicyStatus::Active
    }

    /// Whether this record has the same (owner, consumer, resource) triple
    pub fn same_triple(&self, other: &Policy) -> bool {
        self.owner_id == other.owner_id
            && self.consumer_id == other.consumer_id
            && self.resource_id == other.resource_id
    }
}

/// One requested grant inside a `create_policy` batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantRequest {
    pub consumer_id: String,

    pub resource_id: String,

    #[serde(default)]
    pub constraints: Constraints,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl GrantRequest {
    pub fn new(consumer_id: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            resource_id: resource_id.into(),
            constraints: Constraints::new(),
            expires_at: None,
        }
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }
}

/// Per-item status in a `create_policy` result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    Success,
    Failed,
}

/// Outcome of one grant inside a `create_policy` batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantOutcome {
    pub grant: GrantRequest,

    pub status: GrantStatus,

    /// Id of the created policy on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<Uuid>,

    /// Error kind on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorKind>,

    /// Failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GrantOutcome {
    pub fn success(grant: GrantRequest, policy_id: Uuid) -> Self {
        Self {
            grant,
            status: GrantStatus::Success,
            policy_id: Some(policy_id),
            code: None,
            reason: None,
        }
    }

    pub fn failed(grant: GrantRequest, error: &AaaError) -> Self {
        Self {
            grant,
            status: GrantStatus::Failed,
            policy_id: None,
            code: Some(error.kind()),
            reason: Some(error.message().to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == GrantStatus::Success
    }
}

/// Result of `verify_policy`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allow: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,

    /// Policy that produced an allow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<Uuid>,

    /// Expiry of that policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl PolicyDecision {
    /// The default decision
    pub fn deny() -> Self {
        Self {
            allow: false,
            constraints: None,
            policy_id: None,
            expires_at: None,
        }
    }

    /// Allow on the strength of `policy`
    pub fn allow(policy: &Policy) -> Self {
        Self {
            allow: true,
            constraints: Some(policy.constraints.clone()),
            policy_id: Some(policy.id),
            expires_at: policy.expires_at,
        }
    }
}

/// Field filter shared by revoke and list
///
/// Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,

    /// Effective status; ignored by revoke, which only touches ACTIVE records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PolicyStatus>,
}

impl PolicyFilter {
    pub fn is_empty(&self) -> bool {
        self.owner_id.is_none()
            && self.consumer_id.is_none()
            && self.resource_id.is_none()
            && self.resource_type.is_none()
    }

    /// Whether `policy` matches every set field, evaluating status at `now`
    pub fn matches(&self, policy: &Policy, now: DateTime<Utc>) -> bool {
        self.owner_id.as_ref().map_or(true, |o| *o == policy.owner_id)
            && self.consumer_id.as_ref().map_or(true, |c| *c == policy.consumer_id)
            && self.resource_id.as_ref().map_or(true, |r| *r == policy.resource_id)
            && self.resource_type.map_or(true, |t| t == policy.resource_type)
            && self.status.map_or(true, |s| s == policy.effective_status(now))
    }
}

/// What to revoke
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevokeTarget {
    /// A single policy by id
    Id(Uuid),
    /// Every ACTIVE policy matching the filter
    Filter(PolicyFilter),
}

/// Result of `revoke`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeOutcome {
    /// Ids moved from ACTIVE to REVOKED by this call
    pub revoked: Vec<Uuid>,
}

/// Which side of a grant a listing is for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Owner(String),
    Consumer(String),
}

/// Paginated policy listing request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub party: Party,

    /// Further narrowing; the party field always wins over the same field here
    #[serde(default)]
    pub filter: PolicyFilter,

    #[serde(default)]
    pub offset: u32,

    #[serde(default = "default_page_size")]
    pub limit: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl ListQuery {
    pub fn owner(owner_id: impl Into<String>) -> Self {
        Self::for_party(Party::Owner(owner_id.into()))
    }

    pub fn consumer(consumer_id: impl Into<String>) -> Self {
        Self::for_party(Party::Consumer(consumer_id.into()))
    }

    fn for_party(party: Party) -> Self {
        Self {
            party,
            filter: PolicyFilter::default(),
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_filter(mut self, filter: PolicyFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn page(mut self, offset: u32, limit: u32) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// The filter with the party folded in
    pub fn effective_filter(&self) -> PolicyFilter {
        let mut filter = self.filter.clone();
        match &self.party {
            Party::Owner(owner) => filter.owner_id = Some(owner.clone()),
            Party::Consumer(consumer) => filter.consumer_id = Some(consumer.clone()),
        }
        filter
    }

    /// Limit clamped to `1..=MAX_PAGE_SIZE`
    pub fn clamped_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

/// One page of a policy listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyPage {
    pub items: Vec<Policy>,
    /// Number of matching records across all pages
    pub total: u64,
    pub offset: u32,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Constraint;
    use chrono::Duration;

    fn policy(expires_at: Option<DateTime<Utc>>) -> Policy {
        Policy::new_active(
            "provider-a",
            "consumer-c",
            "rs/item-1",
            ResourceType::Resource,
            Constraints::new().with(Constraint::actions(["read"])),
            expires_at,
            Utc::now(),
        )
    }

    #[test]
    fn test_effective_status_expires_passively() {
        let now = Utc::now();
        let p = policy(Some(now + Duration::minutes(5)));

        assert_eq!(p.effective_status(now), PolicyStatus::Active);
        assert_eq!(p.effective_status(now + Duration::minutes(5)), PolicyStatus::Expired);
        assert_eq!(p.status, PolicyStatus::Active);
    }

    #[test]
    fn test_revoked_stays_revoked() {
        let mut p = policy(None);
        p.status = PolicyStatus::Revoked;
        assert_eq!(p.effective_status(Utc::now()), PolicyStatus::Revoked);
        assert!(!p.is_active_at(Utc::now()));
    }

    #[test]
    fn test_filter_matching() {
        let now = Utc::now();
        let p = policy(None);

        let by_consumer = PolicyFilter {
            consumer_id: Some("consumer-c".into()),
            ..Default::default()
        };
        assert!(by_consumer.matches(&p, now));

        let by_other_owner = PolicyFilter {
            owner_id: Some("provider-b".into()),
            ..Default::default()
        };
        assert!(!by_other_owner.matches(&p, now));

        let by_status = PolicyFilter {
            status: Some(PolicyStatus::Revoked),
            ..Default::default()
        };
        assert!(!by_status.matches(&p, now));
    }

    #[test]
    fn test_failed_outcome_carries_kind() {
        let grant = GrantRequest::new("consumer-c", "rs/item-1");
        let outcome = GrantOutcome::failed(grant, &AaaError::Conflict("already active".into()));

        assert_eq!(outcome.status, GrantStatus::Failed);
        assert_eq!(outcome.code, Some(ErrorKind::Conflict));
        assert_eq!(outcome.reason.as_deref(), Some("already active"));
    }

    #[test]
    fn test_list_query_party_wins() {
        let query = ListQuery::owner("provider-a").with_filter(PolicyFilter {
            owner_id: Some("provider-b".into()),
            ..Default::default()
        });

        assert_eq!(query.effective_filter().owner_id.as_deref(), Some("provider-a"));
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(ListQuery::owner("o").page(0, 0).clamped_limit(), 1);
        assert_eq!(ListQuery::owner("o").page(0, 10_000).clamped_limit(), MAX_PAGE_SIZE);
    }
}
