//! Policy constraints
//!
//! A policy carries at most one constraint per kind. Well-known kinds are
//! modelled explicitly; anything else rides in the `Extension` slot so new
//! kinds can be introduced without a schema change.
//!
//! Constraints serve two purposes:
//! - **Admission**: `actions` and `time_window` decide whether a request is
//!   allowed at all.
//! - **Scope**: every kind is copied into issued tokens, where resource
//!   servers enforce it (e.g. `row_limit`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Generic action used when issuing tokens; admitted by every policy
pub const ACCESS_ACTION: &str = "access";

/// Action wildcard accepted inside an `actions` constraint
pub const ANY_ACTION: &str = "*";

/// Kind key of the `actions` constraint
pub const ACTIONS_KIND: &str = "actions";
/// Kind key of the `row_limit` constraint
pub const ROW_LIMIT_KIND: &str = "row_limit";
/// Kind key of the `time_window` constraint
pub const TIME_WINDOW_KIND: &str = "time_window";

const EXTENSION_PREFIX: &str = "ext:";

/// A single constraint attached to a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// Actions the consumer may perform
    Actions { allowed: BTreeSet<String> },

    /// Maximum number of rows a single request may return
    RowLimit { max_rows: u64 },

    /// Access is only admitted inside `[not_before, not_after)`
    TimeWindow {
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    },

    /// Open-ended constraint understood by the resource server
    Extension {
        key: String,
        value: serde_json::Value,
    },
}

impl Constraint {
    /// Build an `actions` constraint
    pub fn actions<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Constraint::Actions {
            allowed: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a `row_limit` constraint
    pub fn row_limit(max_rows: u64) -> Self {
        Constraint::RowLimit { max_rows }
    }

    /// Build a `time_window` constraint
    pub fn time_window(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        Constraint::TimeWindow {
            not_before,
            not_after,
        }
    }

    /// Build an extension constraint
    pub fn extension(key: impl Into<String>, value: serde_json::Value) -> Self {
        Constraint::Extension {
            key: key.into(),
            value,
        }
    }

    /// Kind key, unique per constraint set
    pub fn kind(&self) -> String {
        match self {
            Constraint::Actions { .. } => ACTIONS_KIND.to_string(),
            Constraint::RowLimit { .. } => ROW_LIMIT_KIND.to_string(),
            Constraint::TimeWindow { .. } => TIME_WINDOW_KIND.to_string(),
            Constraint::Extension { key, .. } => format!("{}{}", EXTENSION_PREFIX, key),
        }
    }

    /// Check the value is well-formed on its own
    fn validate_value(&self) -> Result<(), String> {
        match self {
            Constraint::Actions { allowed } => {
                if allowed.is_empty() {
                    return Err("actions constraint must list at least one action".into());
                }
                if allowed.iter().any(|a| a.trim().is_empty()) {
                    return Err("actions constraint contains a blank action".into());
                }
            }
            Constraint::RowLimit { max_rows } => {
                if *max_rows == 0 {
                    return Err("row_limit must be greater than zero".into());
                }
            }
            Constraint::TimeWindow {
                not_before,
                not_after,
            } => {
                if not_before >= not_after {
                    return Err("time_window must end after it starts".into());
                }
            }
            Constraint::Extension { key, .. } => {
                if key.trim().is_empty() {
                    return Err("extension constraint key cannot be empty".into());
                }
            }
        }
        Ok(())
    }

    /// Whether `self` is at most as permissive as `granted` (same kind)
    fn is_within(&self, granted: &Constraint) -> bool {
        match (self, granted) {
            (Constraint::Actions { allowed: req }, Constraint::Actions { allowed: grant }) => {
                grant.contains(ANY_ACTION) || req.is_subset(grant)
            }
            (Constraint::RowLimit { max_rows: req }, Constraint::RowLimit { max_rows: grant }) => {
                req <= grant
            }
            (
                Constraint::TimeWindow {
                    not_before: req_nb,
                    not_after: req_na,
                },
                Constraint::TimeWindow {
                    not_before: grant_nb,
                    not_after: grant_na,
                },
            ) => req_nb >= grant_nb && req_na <= grant_na,
            (
                Constraint::Extension { key: rk, value: rv },
                Constraint::Extension { key: gk, value: gv },
            ) => rk == gk && rv == gv,
            _ => false,
        }
    }
}

/// Error returned when a requested scope is broader than the grant
#[derive(Error, Debug, Clone, PartialEq)]
#[error("constraint kinds {violating_kinds:?} exceed the granted constraints")]
pub struct ScopeViolation {
    /// Requested kinds broader than the granted value
    pub violating_kinds: Vec<String>,
}

/// The constraint set of a policy or token, keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Constraint>", into = "Vec<Constraint>")]
pub struct Constraints {
    entries: BTreeMap<String, Constraint>,
}

impl TryFrom<Vec<Constraint>> for Constraints {
    type Error = String;

    fn try_from(list: Vec<Constraint>) -> Result<Self, Self::Error> {
        let mut constraints = Constraints::new();
        for constraint in list {
            if let Some(previous) = constraints.insert(constraint) {
                return Err(format!("duplicate constraint kind: {}", previous.kind()));
            }
        }
        Ok(constraints)
    }
}

impl From<Constraints> for Vec<Constraint> {
    fn from(constraints: Constraints) -> Self {
        constraints.entries.into_values().collect()
    }
}

impl Constraints {
    /// Create an empty (unconstrained) set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint, replacing any existing one of the same kind
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.insert(constraint);
        self
    }

    /// Insert a constraint, returning the one it replaced
    pub fn insert(&mut self, constraint: Constraint) -> Option<Constraint> {
        self.entries.insert(constraint.kind(), constraint)
    }

    /// Look up a constraint by kind key
    pub fn get(&self, kind: &str) -> Option<&Constraint> {
        self.entries.get(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.entries.values()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Allowed actions, if restricted
    pub fn allowed_actions(&self) -> Option<&BTreeSet<String>> {
        match self.entries.get(ACTIONS_KIND) {
            Some(Constraint::Actions { allowed }) => Some(allowed),
            _ => None,
        }
    }

    /// Whether `action` is admitted at `now`
    ///
    /// `ACCESS_ACTION` skips the action check but still honours the time
    /// window.
    pub fn admits(&self, action: &str, now: DateTime<Utc>) -> bool {
        if let Some(Constraint::TimeWindow {
            not_before,
            not_after,
        }) = self.entries.get(TIME_WINDOW_KIND)
        {
            if now < *not_before || now >= *not_after {
                return false;
            }
        }

        if action == ACCESS_ACTION {
            return true;
        }

        match self.allowed_actions() {
            Some(allowed) => allowed.contains(ANY_ACTION) || allowed.contains(action),
            None => true,
        }
    }

    /// Validate every value, and every kind against the resource's schema
    ///
    /// `capabilities` lists the kind keys the resource accepts; `None`
    /// accepts every kind.
    pub fn validate(&self, capabilities: Option<&BTreeSet<String>>) -> Result<(), String> {
        for (kind, constraint) in &self.entries {
            constraint.validate_value()?;
            if let Some(accepted) = capabilities {
                if !accepted.contains(kind) {
                    return Err(format!("resource does not accept constraint kind '{}'", kind));
                }
            }
        }
        Ok(())
    }

    /// Ensure `self` (a requested scope) is a subset of `granted`
    ///
    /// A requested kind the grant also carries must be at most as permissive
    /// as the granted value. A kind the grant leaves out is unbounded there,
    /// so any value for it narrows the grant.
    pub fn check_within(&self, granted: &Constraints) -> Result<(), ScopeViolation> {
        let violating_kinds: Vec<String> = self
            .entries
            .iter()
            .filter(|(kind, requested)| {
                granted
                    .entries
                    .get(*kind)
                    .map_or(false, |grant| !requested.is_within(grant))
            })
            .map(|(kind, _)| kind.clone())
            .collect();

        if violating_kinds.is_empty() {
            Ok(())
        } else {
            Err(ScopeViolation { violating_kinds })
        }
    }

    /// The grant with each requested kind replacing the granted value
    ///
    /// Kinds the request leaves out keep the granted value, so narrowing one
    /// kind never drops another.
    pub fn narrowed_by(&self, requested: &Constraints) -> Constraints {
        let mut merged = self.clone();
        for constraint in requested.iter() {
            merged.insert(constraint.clone());
        }
        merged
    }
}
