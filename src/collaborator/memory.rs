//! In-memory authorization collaborator.
//!
//! Holds actors (keyed by bearer token) and per-role granted statements in
//! process memory. Useful for tests, local development, and embedding the
//! gate in services that have no external authentication service to talk
//! to. Thread-safe via `DashMap`.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::{
    ActorMembership, AuthCollaborator, CollaboratorError, RequestContext, Session, SessionUser,
};
use crate::envelope::MemberReply;
use crate::hierarchy::BusinessRole;
use crate::statement::{BusinessPermission, PermissionStatement};

/// A registered actor: who a bearer token authenticates as.
#[derive(Debug, Clone)]
struct RegisteredActor {
    user: SessionUser,
    membership: ActorMembership,
}

/// In-memory implementation of [`AuthCollaborator`].
#[derive(Debug, Clone, Default)]
pub struct StaticCollaborator {
    /// Actors indexed by bearer token.
    actors: Arc<DashMap<String, RegisteredActor>>,
    /// Granted permission statements indexed by role string.
    grants: Arc<DashMap<String, PermissionStatement>>,
}

impl StaticCollaborator {
    /// An empty collaborator: no actors, no grants.
    pub fn new() -> Self {
        Self::default()
    }

    /// A collaborator pre-loaded with the default business-role grants:
    /// owner gets full organization control plus billing, admin gets
    /// organization/team/invite/billing management, projectManager gets
    /// team and invitation management, finance gets billing, member gets
    /// no management claims.
    pub fn with_business_defaults() -> Self {
        let collab = Self::new();
        collab.grant_role(
            BusinessRole::Owner.as_str(),
            BusinessPermission::FullOrgControl
                .statement()
                .merge(BusinessPermission::BillingManagement.statement()),
        );
        collab.grant_role(
            BusinessRole::Admin.as_str(),
            BusinessPermission::OrgManagement
                .statement()
                .merge(BusinessPermission::TeamManagement.statement())
                .merge(BusinessPermission::InviteMembers.statement())
                .merge(BusinessPermission::BillingManagement.statement()),
        );
        collab.grant_role(
            BusinessRole::ProjectManager.as_str(),
            BusinessPermission::TeamManagement
                .statement()
                .merge(BusinessPermission::InviteMembers.statement()),
        );
        collab.grant_role(
            BusinessRole::Finance.as_str(),
            BusinessPermission::BillingManagement.statement(),
        );
        collab.grant_role(BusinessRole::Member.as_str(), PermissionStatement::new());
        collab
    }

    /// Register an actor under a bearer token.
    pub fn register_actor(
        &self,
        token: impl Into<String>,
        user_id: impl Into<String>,
        role: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> &Self {
        let user_id = user_id.into();
        self.actors.insert(
            token.into(),
            RegisteredActor {
                user: SessionUser {
                    id: user_id.clone(),
                    email: None,
                    name: None,
                },
                membership: ActorMembership {
                    role: role.into(),
                    user_id: Some(user_id),
                    organization_id: Some(organization_id.into()),
                },
            },
        );
        self
    }

    /// Set the granted statement for a role, replacing any previous grant.
    pub fn grant_role(&self, role: impl Into<String>, statement: PermissionStatement) -> &Self {
        self.grants.insert(role.into(), statement);
        self
    }

    fn actor_for(&self, ctx: &RequestContext) -> Option<RegisteredActor> {
        let token = ctx.bearer_token()?;
        self.actors.get(token).map(|a| a.clone())
    }
}

#[async_trait]
impl AuthCollaborator for StaticCollaborator {
    async fn get_session(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<Session>, CollaboratorError> {
        Ok(self.actor_for(ctx).map(|actor| Session {
            session_id: format!("static-{}", actor.user.id),
            active_organization_id: actor.membership.organization_id.clone(),
            expires_at: None,
            user: actor.user,
        }))
    }

    async fn get_active_member(
        &self,
        ctx: &RequestContext,
    ) -> Result<MemberReply, CollaboratorError> {
        Ok(match self.actor_for(ctx) {
            Some(actor) => MemberReply::Member {
                role: actor.membership.role,
            },
            None => MemberReply::Absent,
        })
    }

    async fn check_permission(
        &self,
        ctx: &RequestContext,
        statement: &PermissionStatement,
    ) -> Result<bool, CollaboratorError> {
        let Some(actor) = self.actor_for(ctx) else {
            return Ok(false);
        };
        Ok(self
            .grants
            .get(&actor.membership.role)
            .is_some_and(|granted| granted.covers(statement)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
