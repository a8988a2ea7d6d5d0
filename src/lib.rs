//! # rolegate
//!
//! A business-role RBAC decision layer for multi-tenant SaaS services.
//!
//! Sessions, organization membership, and the authoritative allow/deny
//! decision live in an external authentication service, the
//! **authorization collaborator**. This crate is the thin, fail-closed
//! decision layer on top of it:
//!
//! - **Hierarchy**: five business roles on a strict linear ranking, with
//!   level comparison and a lossy projection onto the collaborator's
//!   three-tier role model
//! - **Statements**: permission statements (resource to actions) and the
//!   fixed, named business permission sets
//! - **Collaborator**: the injected [`AuthCollaborator`] boundary, with
//!   HTTP (request-credentialed or ambient) and in-memory implementations
//! - **Gate**: permission/role checks and redirecting route guards, every
//!   one fail-closed: an unanswerable check denies, it never errors
//! - **Middleware**: tower guard layers for routes, with exact-membership
//!   role guards, minimum-level guards, and permission-statement guards
//!
//! # Usage
//!
//! ```rust,ignore
//! use rolegate::{
//!     Gate, HttpCollaborator, RequestContext, RbacConfig,
//!     BusinessPermission, BusinessRole,
//! };
//!
//! let config = RbacConfig::load()?;
//! let collaborator = HttpCollaborator::request_credentialed(config.collaborator)?;
//! let gate = Gate::new(collaborator, config.locale);
//!
//! // Inside a handler:
//! let ctx = RequestContext::from_headers(headers);
//! let session = gate.require_team_management(&ctx, None).await?;
//! if gate.can_manage_billing(&ctx).await {
//!     // show billing controls
//! }
//! ```

pub mod collaborator;
pub mod config;
pub mod envelope;
pub mod error;
pub mod gate;
pub mod hierarchy;
pub mod middleware;
pub mod statement;
pub mod telemetry;

pub use collaborator::{
    ActorMembership, AuthCollaborator, CollaboratorError, HttpCollaborator, RequestContext,
    Session, SessionUser, StaticCollaborator,
};
pub use config::{CollaboratorConfig, LocaleConfig, RbacConfig};
pub use envelope::{
    extract_role_from_member_data, fail_closed, handle_permission_response, handle_rbac_error,
    validate_user_role, MemberReply,
};
pub use error::{ErrorCode, RbacError, Result};
pub use gate::{DeniedRedirect, Gate};
pub use hierarchy::{
    business_ops, has_role_level, role_checks, role_level, BusinessRole, StandardRole,
};
pub use middleware::{
    admin_only, finance_access, minimum_role_guard, owner_only, project_manager_access,
    role_guard, PermissionGuardLayer, PermissionGuardService, RbacContext,
};
pub use statement::{BusinessPermission, PermissionStatement};
pub use telemetry::{init_logging, LogFormat, LoggingConfig};
