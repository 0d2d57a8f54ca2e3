//! Policy Engine Tests
//!
//! These tests drive the engine against the in-memory store and a static
//! catalogue:
//! - Batch creation with per-grant outcomes
//! - Uniqueness of ACTIVE policies under concurrency
//! - Access checks with group and provider fallback
//! - Revocation, expiry and listing

mod common;

use aaa_catalogue::StaticCatalogue;
use aaa_core::{
    Constraint, Constraints, ErrorKind, GrantRequest, GrantStatus, ListQuery, PolicyFilter,
    PolicyStatus, ResourceType, RevokeTarget, MAX_BATCH_SIZE,
};
use aaa_server::{MemoryStore, PolicyEngine};
use chrono::{Duration, Utc};
use common::*;
use std::sync::Arc;
use uuid::Uuid;

// =============================================================================
// create_policy
// =============================================================================

#[tokio::test]
async fn test_create_reports_each_grant_in_order() {
    let engine = engine();

    let outcomes = engine
        .create_policy(
            PROVIDER,
            vec![
                GrantRequest::new(CONSUMER, ITEM),
                GrantRequest::new(CONSUMER, "rs/does-not-exist"),
                GrantRequest::new(CONSUMER, LOOSE_ITEM),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].status, GrantStatus::Success);
    assert!(outcomes[0].policy_id.is_some());
    assert_eq!(outcomes[1].status, GrantStatus::Failed);
    assert_eq!(outcomes[1].code, Some(ErrorKind::NotFound));
    assert_eq!(outcomes[2].status, GrantStatus::Success);
    assert_eq!(outcomes[2].grant.resource_id, LOOSE_ITEM);
}

#[tokio::test]
async fn test_duplicate_grant_conflicts_without_blocking_others() {
    let engine = engine();

    engine
        .create_policy(PROVIDER, vec![GrantRequest::new(CONSUMER, ITEM)])
        .await
        .unwrap();

    let outcomes = engine
        .create_policy(
            PROVIDER,
            vec![
                GrantRequest::new(CONSUMER, ITEM),
                GrantRequest::new(CONSUMER, SIBLING),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcomes[0].code, Some(ErrorKind::Conflict));
    assert!(outcomes[1].is_success());
}

#[tokio::test]
async fn test_only_the_owner_can_grant() {
    let engine = engine();

    let outcomes = engine
        .create_policy(PROVIDER, vec![GrantRequest::new(CONSUMER, FOREIGN_ITEM)])
        .await
        .unwrap();

    assert_eq!(outcomes[0].code, Some(ErrorKind::Authorization));

    let decision = engine.verify_policy(CONSUMER, FOREIGN_ITEM, "read").await.unwrap();
    assert!(!decision.allow);
}

#[tokio::test]
async fn test_batch_level_validation() {
    let engine = engine();

    let err = engine.create_policy(PROVIDER, vec![]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = engine
        .create_policy("  ", vec![GrantRequest::new(CONSUMER, ITEM)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let oversized = (0..=MAX_BATCH_SIZE)
        .map(|i| GrantRequest::new(format!("consumer-{}", i), ITEM))
        .collect();
    let err = engine.create_policy(PROVIDER, oversized).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_grant_field_and_expiry_checks() {
    let engine = engine();
    let now = Utc::now();

    let outcomes = engine
        .create_policy_at(
            PROVIDER,
            vec![
                GrantRequest::new("", ITEM),
                GrantRequest::new(CONSUMER, ITEM).expires_at(now - Duration::minutes(1)),
                GrantRequest::new(CONSUMER, ITEM).with_constraints(
                    Constraints::new().with(Constraint::extension("geo_fence", serde_json::json!("bbox"))),
                ),
            ],
            now,
        )
        .await
        .unwrap();

    assert!(outcomes.iter().all(|o| o.code == Some(ErrorKind::Validation)));
}

#[tokio::test]
async fn test_catalogue_outage_aborts_batch() {
    let catalogue = Arc::new(FlakyCatalogue::new(catalogue()));
    let store = Arc::new(MemoryStore::new());
    let engine = PolicyEngine::new(store.clone(), catalogue.clone());

    catalogue.set_down(true);
    let err = engine
        .create_policy(PROVIDER, vec![GrantRequest::new(CONSUMER, ITEM)])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Store);
    assert!(err.kind().is_retryable());
    assert!(store.is_empty().unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_creates_yield_one_policy() {
    let engine = Arc::new(engine());
    let start = Arc::new(tokio::sync::Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let start = Arc::clone(&start);
            tokio::spawn(async move {
                start.wait().await;
                engine
                    .create_policy(PROVIDER, vec![GrantRequest::new(CONSUMER, ITEM)])
                    .await
                    .unwrap()
                    .remove(0)
            })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        let outcome = handle.await.unwrap();
        match outcome.code {
            None => created += 1,
            Some(ErrorKind::Conflict) => conflicts += 1,
            Some(other) => panic!("unexpected outcome {:?}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 15);
}

#[tokio::test]
async fn test_expired_policy_allows_regrant() {
    let engine = engine();
    let now = Utc::now();

    let first = engine
        .create_policy_at(
            PROVIDER,
            vec![GrantRequest::new(CONSUMER, ITEM).expires_at(now + Duration::minutes(5))],
            now,
        )
        .await
        .unwrap();
    let first_id = first[0].policy_id.unwrap();

    let later = now + Duration::minutes(10);
    let second = engine
        .create_policy_at(PROVIDER, vec![GrantRequest::new(CONSUMER, ITEM)], later)
        .await
        .unwrap();
    assert!(second[0].is_success());

    let page = engine
        .list_policies_at(&ListQuery::owner(PROVIDER), later)
        .await
        .unwrap();
    let expired = page.items.iter().find(|p| p.id == first_id).unwrap();
    assert_eq!(expired.status, PolicyStatus::Expired);
}

// =============================================================================
// verify_policy
// =============================================================================

#[tokio::test]
async fn test_verify_exact_grant_with_actions() {
    let engine = engine();
    engine
        .create_policy(
            PROVIDER,
            vec![GrantRequest::new(CONSUMER, ITEM)
                .with_constraints(Constraints::new().with(Constraint::actions(["read"])))],
        )
        .await
        .unwrap();

    let allowed = engine.verify_policy(CONSUMER, ITEM, "read").await.unwrap();
    assert!(allowed.allow);
    assert!(allowed.policy_id.is_some());
    assert_eq!(
        allowed.constraints.unwrap().allowed_actions().unwrap().len(),
        1
    );

    let denied = engine.verify_policy(CONSUMER, ITEM, "write").await.unwrap();
    assert!(!denied.allow);
    assert!(denied.policy_id.is_none());
}

#[tokio::test]
async fn test_group_grant_covers_member_items() {
    let engine = engine();
    let outcomes = engine
        .create_policy(PROVIDER, vec![GrantRequest::new(CONSUMER, GROUP)])
        .await
        .unwrap();
    let group_policy = outcomes[0].policy_id;

    for item in [ITEM, SIBLING] {
        let decision = engine.verify_policy(CONSUMER, item, "read").await.unwrap();
        assert!(decision.allow, "group grant should cover {}", item);
        assert_eq!(decision.policy_id, group_policy);
    }

    let outside = engine.verify_policy(CONSUMER, LOOSE_ITEM, "read").await.unwrap();
    assert!(!outside.allow);
}

#[tokio::test]
async fn test_provider_grant_covers_everything_it_owns() {
    let engine = engine();
    engine
        .create_policy(PROVIDER, vec![GrantRequest::new(CONSUMER, PROVIDER)])
        .await
        .unwrap();

    for item in [ITEM, SIBLING, LOOSE_ITEM, GROUP] {
        assert!(engine.verify_policy(CONSUMER, item, "read").await.unwrap().allow);
    }
    assert!(!engine.verify_policy(CONSUMER, FOREIGN_ITEM, "read").await.unwrap().allow);
}

#[tokio::test]
async fn test_exact_grant_wins_over_group_grant() {
    let engine = engine();
    let outcomes = engine
        .create_policy(
            PROVIDER,
            vec![
                GrantRequest::new(CONSUMER, GROUP),
                GrantRequest::new(CONSUMER, ITEM)
                    .with_constraints(Constraints::new().with(Constraint::row_limit(10))),
            ],
        )
        .await
        .unwrap();

    let decision = engine.verify_policy(CONSUMER, ITEM, "read").await.unwrap();
    assert_eq!(decision.policy_id, outcomes[1].policy_id);
}

#[tokio::test]
async fn test_unknown_resource_and_blank_inputs_deny() {
    let engine = engine();

    assert!(!engine.verify_policy(CONSUMER, "rs/unknown", "read").await.unwrap().allow);
    assert!(!engine.verify_policy("", ITEM, "read").await.unwrap().allow);
    assert!(!engine.verify_policy(CONSUMER, "", "read").await.unwrap().allow);
}

#[tokio::test]
async fn test_time_window_bounds_access() {
    let engine = engine();
    let now = Utc::now();
    let window = Constraint::time_window(now + Duration::hours(1), now + Duration::hours(2));

    engine
        .create_policy_at(
            PROVIDER,
            vec![GrantRequest::new(CONSUMER, ITEM).with_constraints(Constraints::new().with(window))],
            now,
        )
        .await
        .unwrap();

    let before = engine.verify_policy_at(CONSUMER, ITEM, "read", now).await.unwrap();
    assert!(!before.allow);

    let inside = now + Duration::minutes(90);
    let during = engine.verify_policy_at(CONSUMER, ITEM, "read", inside).await.unwrap();
    assert!(during.allow);
}

#[tokio::test]
async fn test_verify_surfaces_catalogue_outage() {
    let catalogue = Arc::new(FlakyCatalogue::new(catalogue()));
    let engine = PolicyEngine::new(Arc::new(MemoryStore::new()), catalogue.clone());

    catalogue.set_down(true);
    let err = engine.verify_policy(CONSUMER, ITEM, "read").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
}

// =============================================================================
// revoke
// =============================================================================

#[tokio::test]
async fn test_revoke_is_visible_immediately() {
    let engine = engine();
    let outcomes = engine
        .create_policy(PROVIDER, vec![GrantRequest::new(CONSUMER, ITEM)])
        .await
        .unwrap();
    let id = outcomes[0].policy_id.unwrap();

    let revoked = engine.revoke(RevokeTarget::Id(id)).await.unwrap();
    assert_eq!(revoked.revoked, vec![id]);

    assert!(!engine.verify_policy(CONSUMER, ITEM, "read").await.unwrap().allow);

    let again = engine.revoke(RevokeTarget::Id(id)).await.unwrap_err();
    assert_eq!(again.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_revoke_by_filter_touches_only_active_matches() {
    let engine = engine();
    engine
        .create_policy(
            PROVIDER,
            vec![
                GrantRequest::new(CONSUMER, ITEM),
                GrantRequest::new(CONSUMER, SIBLING),
                GrantRequest::new("consumer-d", ITEM),
            ],
        )
        .await
        .unwrap();

    let outcome = engine
        .revoke(RevokeTarget::Filter(PolicyFilter {
            consumer_id: Some(CONSUMER.into()),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(outcome.revoked.len(), 2);

    assert!(engine.verify_policy("consumer-d", ITEM, "read").await.unwrap().allow);

    let repeat = engine
        .revoke(RevokeTarget::Filter(PolicyFilter {
            consumer_id: Some(CONSUMER.into()),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert!(repeat.revoked.is_empty());
}

#[tokio::test]
async fn test_revoke_rejects_empty_filter_and_unknown_id() {
    let engine = engine();

    let err = engine
        .revoke(RevokeTarget::Filter(PolicyFilter::default()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = engine.revoke(RevokeTarget::Id(Uuid::new_v4())).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_revoked_policy_can_be_granted_again() {
    let engine = engine();
    let first = engine
        .create_policy(PROVIDER, vec![GrantRequest::new(CONSUMER, ITEM)])
        .await
        .unwrap();
    engine
        .revoke(RevokeTarget::Id(first[0].policy_id.unwrap()))
        .await
        .unwrap();

    let second = engine
        .create_policy(PROVIDER, vec![GrantRequest::new(CONSUMER, ITEM)])
        .await
        .unwrap();
    assert!(second[0].is_success());
    assert_ne!(second[0].policy_id, first[0].policy_id);
}

// =============================================================================
// list_policies
// =============================================================================

#[tokio::test]
async fn test_list_by_party_with_filters_and_paging() {
    let engine = engine();
    engine
        .create_policy(
            PROVIDER,
            vec![
                GrantRequest::new(CONSUMER, ITEM),
                GrantRequest::new(CONSUMER, SIBLING),
                GrantRequest::new(CONSUMER, GROUP),
                GrantRequest::new("consumer-d", ITEM),
            ],
        )
        .await
        .unwrap();

    let held = engine.list_policies(&ListQuery::consumer(CONSUMER)).await.unwrap();
    assert_eq!(held.total, 3);

    let groups = engine
        .list_policies(&ListQuery::owner(PROVIDER).with_filter(PolicyFilter {
            resource_type: Some(ResourceType::ResourceGroup),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(groups.total, 1);
    assert_eq!(groups.items[0].resource_id, GROUP);

    let first_page = engine
        .list_policies(&ListQuery::owner(PROVIDER).page(0, 3))
        .await
        .unwrap();
    let second_page = engine
        .list_policies(&ListQuery::owner(PROVIDER).page(3, 3))
        .await
        .unwrap();
    assert_eq!(first_page.total, 4);
    assert_eq!(first_page.items.len(), 3);
    assert_eq!(second_page.items.len(), 1);
    assert!(first_page.items.iter().all(|p| p.id != second_page.items[0].id));
}

#[tokio::test]
async fn test_list_status_filter_uses_effective_status() {
    let engine = engine();
    let now = Utc::now();
    engine
        .create_policy_at(
            PROVIDER,
            vec![
                GrantRequest::new(CONSUMER, ITEM).expires_at(now + Duration::minutes(1)),
                GrantRequest::new(CONSUMER, SIBLING),
            ],
            now,
        )
        .await
        .unwrap();

    let later = now + Duration::minutes(5);
    let active = engine
        .list_policies_at(
            &ListQuery::consumer(CONSUMER).with_filter(PolicyFilter {
                status: Some(PolicyStatus::Active),
                ..Default::default()
            }),
            later,
        )
        .await
        .unwrap();

    assert_eq!(active.total, 1);
    assert_eq!(active.items[0].resource_id, SIBLING);
}

#[tokio::test]
async fn test_list_requires_a_party() {
    let engine = engine();
    let err = engine.list_policies(&ListQuery::owner("")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_engine_over_json_catalogue() {
    let json = serde_json::json!([
        { "id": "rs/x", "provider_id": "p-x", "resource_type": "resource" }
    ])
    .to_string();
    let catalogue = StaticCatalogue::from_json_str(&json).unwrap();
    let engine = PolicyEngine::new(Arc::new(MemoryStore::new()), Arc::new(catalogue));

    let outcomes = engine
        .create_policy("p-x", vec![GrantRequest::new(CONSUMER, "rs/x")])
        .await
        .unwrap();
    assert!(outcomes[0].is_success());
}
