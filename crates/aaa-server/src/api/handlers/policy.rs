//! Policy Handlers
//!
//! Create, verify, revoke and list policies.

use aaa_core::{
    GrantOutcome, GrantRequest, ListQuery, PolicyDecision, PolicyFilter, PolicyPage,
    PolicyStatus, ResourceType, RevokeTarget, DEFAULT_PAGE_SIZE,
};
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;
use crate::api::error::ApiError;

/// Request to create a batch of policies
#[derive(Debug, Deserialize)]
pub struct CreatePoliciesRequest {
    /// Granting provider
    pub owner_id: String,

    pub grants: Vec<GrantRequest>,
}

/// Per-grant outcomes, in request order
#[derive(Debug, Serialize)]
pub struct CreatePoliciesResponse {
    pub results: Vec<GrantOutcome>,
}

/// Create policies
///
/// POST /v1/policies
///
/// Per-grant failures are reported inline; the call itself succeeds.
pub async fn create_policies(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreatePoliciesRequest>, JsonRejection>,
) -> Result<Json<CreatePoliciesResponse>, ApiError> {
    let Json(request) = payload?;
    let results = state
        .engine
        .create_policy(&request.owner_id, request.grants)
        .await?;
    Ok(Json(CreatePoliciesResponse { results }))
}

/// Request to check access
#[derive(Debug, Deserialize)]
pub struct VerifyPolicyRequest {
    pub consumer_id: String,
    pub resource_id: String,
    pub action: String,
}

/// Check whether a consumer may act on a resource
///
/// POST /v1/policies/verify
pub async fn verify_policy(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyPolicyRequest>, JsonRejection>,
) -> Result<Json<PolicyDecision>, ApiError> {
    let Json(request) = payload?;
    let decision = state
        .engine
        .verify_policy(&request.consumer_id, &request.resource_id, &request.action)
        .await?;
    Ok(Json(decision))
}

/// Request to revoke; exactly one of `policy_id` and `filter`
#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    #[serde(default)]
    pub policy_id: Option<Uuid>,

    #[serde(default)]
    pub filter: Option<PolicyFilter>,
}

impl RevokeRequest {
    fn into_target(self) -> Result<RevokeTarget, ApiError> {
        match (self.policy_id, self.filter) {
            (Some(id), None) => Ok(RevokeTarget::Id(id)),
            (None, Some(filter)) => Ok(RevokeTarget::Filter(filter)),
            _ => Err(ApiError::BadRequest(
                "exactly one of policy_id and filter is required".into(),
            )),
        }
    }
}

/// Revocation result
#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub status: String,
    pub revoked: Vec<Uuid>,
}

/// Revoke policies
///
/// POST /v1/policies/revoke
pub async fn revoke_policies(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RevokeRequest>, JsonRejection>,
) -> Result<Json<RevokeResponse>, ApiError> {
    let Json(request) = payload?;
    let outcome = state.engine.revoke(request.into_target()?).await?;
    Ok(Json(RevokeResponse {
        status: "revoked".into(),
        revoked: outcome.revoked,
    }))
}

/// Query parameters for listing; exactly one of `owner_id` and `consumer_id`
#[derive(Debug, Default, Deserialize)]
pub struct ListPoliciesParams {
    pub owner_id: Option<String>,
    pub consumer_id: Option<String>,
    pub resource_id: Option<String>,
    pub resource_type: Option<String>,
    pub status: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl ListPoliciesParams {
    fn into_query(self) -> Result<ListQuery, ApiError> {
        let query = match (self.owner_id, self.consumer_id) {
            (Some(owner), None) => ListQuery::owner(owner),
            (None, Some(consumer)) => ListQuery::consumer(consumer),
            _ => {
                return Err(ApiError::BadRequest(
                    "exactly one of owner_id and consumer_id is required".into(),
                ))
            }
        };

        let resource_type = self
            .resource_type
            .map(|t| t.parse::<ResourceType>())
            .transpose()
            .map_err(ApiError::BadRequest)?;
        let status = self
            .status
            .map(|s| s.parse::<PolicyStatus>())
            .transpose()
            .map_err(ApiError::BadRequest)?;

        Ok(query
            .with_filter(PolicyFilter {
                resource_id: self.resource_id,
                resource_type,
                status,
                ..Default::default()
            })
            .page(self.offset.unwrap_or(0), self.limit.unwrap_or(DEFAULT_PAGE_SIZE)))
    }
}

/// List policies granted by an owner or held by a consumer
///
/// GET /v1/policies
pub async fn list_policies(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListPoliciesParams>, QueryRejection>,
) -> Result<Json<PolicyPage>, ApiError> {
    let Query(params) = params?;
    let page = state.engine.list_policies(&params.into_query()?).await?;
    Ok(Json(page))
}
