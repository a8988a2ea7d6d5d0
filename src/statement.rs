//! Permission statements and the named business permission sets.
//!
//! A [`PermissionStatement`] maps resource names to the set of actions
//! claimed on that resource, e.g.
//! `{ "member": ["create", "update", "delete"], "invitation": ["create"] }`.
//! The absence of a resource key means "no claim about this resource", not
//! "denied"; the authoritative allow/deny decision belongs to the
//! authorization collaborator, never to this data shape.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ═══════════════════════════════════════════════════════════════════════════════
// Permission statement
// ═══════════════════════════════════════════════════════════════════════════════

/// A claim of actions over named resources, evaluated by the collaborator.
///
/// Action sets are unordered; `BTreeMap`/`BTreeSet` keep the serialized
/// form stable for logging and test assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionStatement(BTreeMap<String, BTreeSet<String>>);

impl PermissionStatement {
    /// An empty statement: no claims about any resource.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add actions for a resource, merging with any existing claim.
    pub fn grant<I, S>(mut self, resource: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(resource.into())
            .or_default()
            .extend(actions.into_iter().map(Into::into));
        self
    }

    /// Merge another statement into this one.
    pub fn merge(mut self, other: PermissionStatement) -> Self {
        for (resource, actions) in other.0 {
            self.0.entry(resource).or_default().extend(actions);
        }
        self
    }

    /// True if this statement makes no claims at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The resources this statement makes claims about.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The actions claimed on a resource, if any.
    pub fn actions(&self, resource: &str) -> Option<&BTreeSet<String>> {
        self.0.get(resource)
    }

    /// Does this statement claim a specific action on a resource?
    pub fn claims(&self, resource: &str, action: &str) -> bool {
        self.0.get(resource).is_some_and(|a| a.contains(action))
    }

    /// Is every claim in `other` also present here?
    ///
    /// Used by the in-memory collaborator; the HTTP collaborator defers
    /// containment to the remote service.
    pub fn covers(&self, other: &PermissionStatement) -> bool {
        other.0.iter().all(|(resource, actions)| {
            self.0
                .get(resource)
                .is_some_and(|granted| actions.is_subset(granted))
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Business permission sets
// ═══════════════════════════════════════════════════════════════════════════════

/// The named, fixed permission sets used by business operations.
///
/// Defined in code, immutable, never mutated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusinessPermission {
    TeamManagement,
    OrgManagement,
    FullOrgControl,
    InviteMembers,
    BillingManagement,
}

impl BusinessPermission {
    /// Human-meaningful label for logs and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TeamManagement => "TEAM_MANAGEMENT",
            Self::OrgManagement => "ORG_MANAGEMENT",
            Self::FullOrgControl => "FULL_ORG_CONTROL",
            Self::InviteMembers => "INVITE_MEMBERS",
            Self::BillingManagement => "BILLING_MANAGEMENT",
        }
    }

    /// The fixed permission statement associated with this set.
    pub fn statement(&self) -> PermissionStatement {
        match self {
            Self::TeamManagement => PermissionStatement::new()
                .grant("member", ["create", "update", "delete"])
                .grant("invitation", ["create", "cancel"]),
            Self::OrgManagement => PermissionStatement::new()
                .grant("organization", ["update"])
                .grant("member", ["create", "update", "delete"]),
            Self::FullOrgControl => PermissionStatement::new()
                .grant("organization", ["update", "delete"])
                .grant("member", ["create", "update", "delete"])
                .grant("invitation", ["create", "cancel"]),
            Self::InviteMembers => {
                PermissionStatement::new().grant("invitation", ["create"])
            }
            Self::BillingManagement => PermissionStatement::new()
                .grant("organization", ["update"]),
        }
    }

    /// All business permission sets.
    pub fn all() -> [BusinessPermission; 5] {
        [
            Self::TeamManagement,
            Self::OrgManagement,
            Self::FullOrgControl,
            Self::InviteMembers,
            Self::BillingManagement,
        ]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
