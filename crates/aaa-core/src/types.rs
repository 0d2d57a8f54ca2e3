//! Common types used across the control plane

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of catalogue item a policy grants access to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// A single resource item
    Resource,
    /// A group of resource items
    ResourceGroup,
    /// A provider-level capability covering every item of the provider
    Provider,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Resource => "resource",
            ResourceType::ResourceGroup => "resource_group",
            ResourceType::Provider => "provider",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resource" => Ok(ResourceType::Resource),
            "resource_group" | "resourcegroup" | "group" => Ok(ResourceType::ResourceGroup),
            "provider" => Ok(ResourceType::Provider),
            _ => Err(format!("Unknown resource type: {}", s)),
        }
    }
}

/// Lifecycle status of a policy record
///
/// Transitions are one-directional: ACTIVE -> REVOKED or ACTIVE -> EXPIRED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyStatus {
    Active,
    Expired,
    Revoked,
}

impl PolicyStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyStatus::Active => "active",
            PolicyStatus::Expired => "expired",
            PolicyStatus::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PolicyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(PolicyStatus::Active),
            "expired" => Ok(PolicyStatus::Expired),
            "revoked" => Ok(PolicyStatus::Revoked),
            _ => Err(format!("Unknown policy status: {}", s)),
        }
    }
}

/// Role asserted by the upstream authentication step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Consumer,
    Provider,
    Delegate,
    Admin,
}

/// An authenticated caller
///
/// Produced by an upstream authentication step; the control plane trusts it
/// as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The identity being granted access
    pub consumer_id: String,

    /// Role under which the caller acts
    #[serde(default)]
    pub role: Role,

    /// Upstream identity provider, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

impl Identity {
    /// Create a consumer identity
    pub fn consumer(consumer_id: impl Into<String>) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            role: Role::Consumer,
            issuer: None,
        }
    }

    /// Set the role
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set the upstream issuer
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }
}

/// Catalogue view of a resource item
///
/// Only the fields the policy engine consumes are modelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Catalogue item identifier
    pub id: String,

    /// Identity of the provider that owns the item
    pub provider_id: String,

    /// Kind of item
    pub resource_type: ResourceType,

    /// Endpoints serving the item
    #[serde(default)]
    pub endpoints: BTreeSet<String>,

    /// Resource group the item belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// Constraint kinds the item accepts; `None` accepts every kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<BTreeSet<String>>,
}

impl ResourceDescriptor {
    /// Create a descriptor for a single resource item
    pub fn new(
        id: impl Into<String>,
        provider_id: impl Into<String>,
        resource_type: ResourceType,
    ) -> Self {
        Self {
            id: id.into(),
            provider_id: provider_id.into(),
            resource_type,
            endpoints: BTreeSet::new(),
            group_id: None,
            capabilities: None,
        }
    }

    /// Add a serving endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.insert(endpoint.into());
        self
    }

    /// Place the item in a resource group
    pub fn in_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Declare the constraint kinds the item accepts
    pub fn with_capabilities<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = Some(kinds.into_iter().map(Into::into).collect());
        self
    }
}
