//! Business roles and the linear role hierarchy.
//!
//! Five business-facing roles, strictly ranked:
//!
//! | Role           | Level | Description                                      |
//! |----------------|-------|--------------------------------------------------|
//! | Owner          | 100   | Full control, including ownership transfer        |
//! | Admin          | 80    | Organization management                          |
//! | ProjectManager | 60    | Team and invitation management                   |
//! | Finance        | 40    | Billing and subscription management              |
//! | Member         | 20    | Baseline membership                              |
//!
//! An unrecognized role string is level 0 (least privileged), never an error.
//! The hierarchy is monotonic: every capability granted at a lower level is
//! implied at every higher level.

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Business roles
// ═══════════════════════════════════════════════════════════════════════════════

/// A business-facing role within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BusinessRole {
    Member,
    Finance,
    ProjectManager,
    Admin,
    Owner,
}

impl BusinessRole {
    /// The wire-format role string used by the authorization collaborator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Finance => "finance",
            Self::ProjectManager => "projectManager",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Parse a wire-format role string. Unknown strings yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Self::Member),
            "finance" => Some(Self::Finance),
            "projectManager" => Some(Self::ProjectManager),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    /// The numeric hierarchy level of this role.
    pub const fn level(&self) -> u8 {
        match self {
            Self::Member => 20,
            Self::Finance => 40,
            Self::ProjectManager => 60,
            Self::Admin => 80,
            Self::Owner => 100,
        }
    }

    /// Project this role onto the collaborator's coarse three-tier model.
    ///
    /// Lossy, many-to-one, and total: finer-grained business roles degrade
    /// to the nearest coarse tier when crossing the collaborator boundary.
    pub const fn to_standard(self) -> StandardRole {
        match self {
            Self::Owner => StandardRole::Owner,
            Self::Admin | Self::ProjectManager => StandardRole::Admin,
            Self::Member | Self::Finance => StandardRole::Member,
        }
    }

    /// All business roles, lowest level first.
    pub fn all() -> [BusinessRole; 5] {
        [
            Self::Member,
            Self::Finance,
            Self::ProjectManager,
            Self::Admin,
            Self::Owner,
        ]
    }
}

impl fmt::Display for BusinessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The collaborator's three-tier role model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StandardRole {
    Member,
    Admin,
    Owner,
}

impl StandardRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Lift a standard role back into the business hierarchy.
    pub const fn to_business(self) -> BusinessRole {
        match self {
            Self::Member => BusinessRole::Member,
            Self::Admin => BusinessRole::Admin,
            Self::Owner => BusinessRole::Owner,
        }
    }
}

impl fmt::Display for StandardRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Level comparison
// ═══════════════════════════════════════════════════════════════════════════════

/// Numeric hierarchy level for an arbitrary role string.
///
/// Unknown or missing roles are level 0, the least privileged.
pub fn role_level(role: &str) -> u8 {
    BusinessRole::parse(role).map_or(0, |r| r.level())
}

/// Does `actor_role` sit at or above `required` in the hierarchy?
pub fn has_role_level(actor_role: &str, required: BusinessRole) -> bool {
    role_level(actor_role) >= required.level()
}

/// Fixed-target aliases of [`has_role_level`].
///
/// These are literal aliases so a hierarchy change propagates everywhere.
pub mod role_checks {
    use super::{has_role_level, BusinessRole};

    pub fn is_owner(role: &str) -> bool {
        has_role_level(role, BusinessRole::Owner)
    }

    pub fn is_admin(role: &str) -> bool {
        has_role_level(role, BusinessRole::Admin)
    }

    pub fn is_project_manager(role: &str) -> bool {
        has_role_level(role, BusinessRole::ProjectManager)
    }

    pub fn is_finance(role: &str) -> bool {
        has_role_level(role, BusinessRole::Finance)
    }

    pub fn is_member(role: &str) -> bool {
        has_role_level(role, BusinessRole::Member)
    }
}

/// Business-operation predicates combining hierarchy checks.
pub mod business_ops {
    use super::role_checks;

    /// Team management requires the project-manager track or above.
    pub fn can_manage_team(role: &str) -> bool {
        role_checks::is_project_manager(role)
    }

    /// Organization management requires admin or above.
    pub fn can_manage_org(role: &str) -> bool {
        role_checks::is_admin(role)
    }

    /// Billing is cross-cutting: the finance track and the admin track
    /// qualify independently. A union, not a pure hierarchy check.
    pub fn can_manage_billing(role: &str) -> bool {
        role_checks::is_finance(role) || role_checks::is_admin(role)
    }

    /// Inviting members requires the project-manager track or above.
    pub fn can_invite_members(role: &str) -> bool {
        role_checks::is_project_manager(role)
    }

    /// Ownership transfer is reserved for the owner.
    pub fn can_transfer_ownership(role: &str) -> bool {
        role_checks::is_owner(role)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
