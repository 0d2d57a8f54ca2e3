//! Validation logic for grants and token scopes
//!
//! These checks run before anything is persisted or signed.

use aaa_core::{AaaError, Constraints, GrantRequest, ResourceDescriptor, Result, MAX_BATCH_SIZE};
use chrono::{DateTime, Utc};
use tracing::warn;

/// Validate the shape of a whole `create_policy` call
pub fn validate_batch(owner_id: &str, batch_len: usize) -> Result<()> {
    if owner_id.trim().is_empty() {
        return Err(AaaError::Validation("owner id cannot be empty".into()));
    }
    if batch_len == 0 {
        return Err(AaaError::Validation("at least one grant is required".into()));
    }
    if batch_len > MAX_BATCH_SIZE {
        return Err(AaaError::Validation(format!(
            "batch of {} grants exceeds the maximum of {}",
            batch_len, MAX_BATCH_SIZE
        )));
    }
    Ok(())
}

/// Field checks that need no catalogue lookup
pub fn validate_grant_fields(grant: &GrantRequest) -> Result<()> {
    if grant.consumer_id.trim().is_empty() {
        return Err(AaaError::Validation("consumer id cannot be empty".into()));
    }
    if grant.resource_id.trim().is_empty() {
        return Err(AaaError::Validation("resource id cannot be empty".into()));
    }
    Ok(())
}

/// Check a grant against the resolved catalogue item
///
/// The owner must be the item's provider; the expiry must be in the future;
/// every constraint must be well-formed and of a kind the item accepts.
pub fn validate_grant(
    owner_id: &str,
    grant: &GrantRequest,
    item: &ResourceDescriptor,
    now: DateTime<Utc>,
) -> Result<()> {
    if item.provider_id != owner_id {
        warn!(
            owner_id = %owner_id,
            resource_id = %item.id,
            provider_id = %item.provider_id,
            "SECURITY: Grant attempted by a non-owner"
        );
        return Err(AaaError::Authorization(format!(
            "'{}' does not own resource '{}'",
            owner_id, item.id
        )));
    }

    if let Some(expires_at) = grant.expires_at {
        if expires_at <= now {
            return Err(AaaError::Validation(format!(
                "expiry {} is not in the future",
                expires_at.to_rfc3339()
            )));
        }
    }

    grant
        .constraints
        .validate(item.capabilities.as_ref())
        .map_err(AaaError::Validation)
}

/// Ensure a requested token scope does not exceed the granted constraints
pub fn validate_scope(requested: &Constraints, granted: &Constraints) -> Result<()> {
    requested.validate(None).map_err(AaaError::Validation)?;

    requested.check_within(granted).map_err(|violation| {
        warn!(
            violating_kinds = ?violation.violating_kinds,
            "SECURITY: Requested scope exceeds the grant"
        );
        AaaError::Scope(violation.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aaa_core::{Constraint, ErrorKind, ResourceType};
    use chrono::Duration;

    fn item() -> ResourceDescriptor {
        ResourceDescriptor::new("rs/item-1", "provider-a", ResourceType::Resource)
            .with_capabilities(["actions", "row_limit"])
    }

    #[test]
    fn test_batch_limits() {
        assert!(validate_batch("provider-a", 1).is_ok());
        assert!(validate_batch("provider-a", MAX_BATCH_SIZE).is_ok());

        for (owner, len) in [("", 1), ("provider-a", 0), ("provider-a", MAX_BATCH_SIZE + 1)] {
            let err = validate_batch(owner, len).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn test_non_owner_is_authorization_error() {
        let grant = GrantRequest::new("consumer-c", "rs/item-1");
        let err = validate_grant("provider-b", &grant, &item(), Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_past_expiry_rejected() {
        let now = Utc::now();
        let grant = GrantRequest::new("consumer-c", "rs/item-1").expires_at(now);
        let err = validate_grant("provider-a", &grant, &item(), now).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let grant = GrantRequest::new("consumer-c", "rs/item-1").expires_at(now + Duration::hours(1));
        assert!(validate_grant("provider-a", &grant, &item(), now).is_ok());
    }

    #[test]
    fn test_unaccepted_constraint_kind_rejected() {
        let now = Utc::now();
        let grant = GrantRequest::new("consumer-c", "rs/item-1").with_constraints(
            Constraints::new().with(Constraint::time_window(now, now + Duration::hours(1))),
        );
        let err = validate_grant("provider-a", &grant, &item(), now).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_scope_widening_is_scope_error() {
        let granted = Constraints::new().with(Constraint::row_limit(100));
        let wider = Constraints::new().with(Constraint::row_limit(101));
        let err = validate_scope(&wider, &granted).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Scope);

        let narrower = Constraints::new().with(Constraint::row_limit(10));
        assert!(validate_scope(&narrower, &granted).is_ok());
    }

    #[test]
    fn test_blank_consumer_rejected() {
        let err = validate_grant_fields(&GrantRequest::new(" ", "rs/item-1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
