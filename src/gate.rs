//! The authorization gate.
//!
//! [`Gate`] is written once, generically, against the [`AuthCollaborator`]
//! trait; the credential mode of the injected collaborator decides whether
//! it behaves as the server-side gate (request-header credentials) or the
//! ambient-credentialed gate. Boolean checks are fail-closed: any failure
//! while contacting the collaborator resolves to "denied", never an error.
//! `require_*` variants instead resolve failures to a server-side redirect,
//! for use at the top of a page or route handler where
//! redirect-as-control-flow is the idiom.
//!
//! Every check independently re-fetches session and membership per call.
//! There is no caching, batching, or retry here; concurrent checks for the
//! same actor are independent round trips against the collaborator's own
//! consistency model.

use axum::response::{IntoResponse, Redirect, Response};
use std::sync::Arc;
use tracing::debug;

use crate::collaborator::{AuthCollaborator, RequestContext, Session};
use crate::config::LocaleConfig;
use crate::envelope::{fail_closed, validate_user_role};
use crate::hierarchy::{has_role_level, BusinessRole};
use crate::statement::{BusinessPermission, PermissionStatement};

// ═══════════════════════════════════════════════════════════════════════════════
// Denied redirect
// ═══════════════════════════════════════════════════════════════════════════════

/// The deny outcome of a `require_*` guard: a server-side redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeniedRedirect {
    /// Where the denied request is sent, e.g. `/en/dashboard`.
    pub location: String,
}

impl IntoResponse for DeniedRedirect {
    fn into_response(self) -> Response {
        Redirect::to(&self.location).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Gate
// ═══════════════════════════════════════════════════════════════════════════════

/// Permission and role checks over an injected authorization collaborator.
#[derive(Debug)]
pub struct Gate<C> {
    collaborator: Arc<C>,
    locale: LocaleConfig,
}

impl<C> Clone for Gate<C> {
    fn clone(&self) -> Self {
        Self {
            collaborator: Arc::clone(&self.collaborator),
            locale: self.locale.clone(),
        }
    }
}

impl<C: AuthCollaborator> Gate<C> {
    /// Create a gate over a collaborator.
    pub fn new(collaborator: C, locale: LocaleConfig) -> Self {
        Self {
            collaborator: Arc::new(collaborator),
            locale,
        }
    }

    /// Create a gate over a shared collaborator.
    pub fn from_arc(collaborator: Arc<C>, locale: LocaleConfig) -> Self {
        Self {
            collaborator,
            locale,
        }
    }

    /// The collaborator this gate consults.
    pub fn collaborator(&self) -> &Arc<C> {
        &self.collaborator
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fail-closed boolean checks
    // ─────────────────────────────────────────────────────────────────────────

    /// Is there an authenticated session for this context?
    pub async fn is_authenticated(&self, ctx: &RequestContext) -> bool {
        fail_closed("is_authenticated", false, async {
            Ok(self.collaborator.get_session(ctx).await?.is_some())
        })
        .await
    }

    /// The actor's role in their active organization, if known.
    ///
    /// `None` covers "not a member", "no role reported", and every failure
    /// mode; callers must not distinguish "denied" from "unknown" here.
    pub async fn current_role(&self, ctx: &RequestContext) -> Option<String> {
        fail_closed("current_role", None, async {
            let reply = self.collaborator.get_active_member(ctx).await?;
            Ok(reply.role().map(ToString::to_string))
        })
        .await
    }

    /// Does the actor satisfy a permission statement?
    pub async fn has_permission(
        &self,
        ctx: &RequestContext,
        statement: &PermissionStatement,
    ) -> bool {
        fail_closed("has_permission", false, async {
            Ok(self.collaborator.check_permission(ctx, statement).await?)
        })
        .await
    }

    /// Does the actor satisfy at least one of the given statements?
    pub async fn has_any_permission(
        &self,
        ctx: &RequestContext,
        statements: &[PermissionStatement],
    ) -> bool {
        for statement in statements {
            if self.has_permission(ctx, statement).await {
                return true;
            }
        }
        false
    }

    /// Does the actor's role satisfy the target role string?
    ///
    /// Matching follows [`validate_user_role`]: exact equality or substring
    /// containment.
    pub async fn has_role(&self, ctx: &RequestContext, target: &str) -> bool {
        match self.current_role(ctx).await {
            Some(role) => validate_user_role(&role, target),
            None => false,
        }
    }

    /// Does the actor's role satisfy any of the target role strings?
    pub async fn has_any_role(&self, ctx: &RequestContext, targets: &[&str]) -> bool {
        match self.current_role(ctx).await {
            Some(role) => targets.iter().any(|t| validate_user_role(&role, t)),
            None => false,
        }
    }

    /// Does the actor's role sit at or above `minimum` in the hierarchy?
    pub async fn has_min_role(&self, ctx: &RequestContext, minimum: BusinessRole) -> bool {
        match self.current_role(ctx).await {
            Some(role) => has_role_level(&role, minimum),
            None => false,
        }
    }

    /// Can the actor manage the team? (TEAM_MANAGEMENT statement)
    pub async fn can_manage_team(&self, ctx: &RequestContext) -> bool {
        self.has_permission(ctx, &BusinessPermission::TeamManagement.statement())
            .await
    }

    /// Can the actor manage the organization? (ORG_MANAGEMENT statement)
    pub async fn can_manage_org(&self, ctx: &RequestContext) -> bool {
        self.has_permission(ctx, &BusinessPermission::OrgManagement.statement())
            .await
    }

    /// Can the actor manage billing? (BILLING_MANAGEMENT statement)
    pub async fn can_manage_billing(&self, ctx: &RequestContext) -> bool {
        self.has_permission(ctx, &BusinessPermission::BillingManagement.statement())
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Redirecting route guards
    // ─────────────────────────────────────────────────────────────────────────

    /// The redirect a denied request is answered with: an explicit target
    /// when supplied, else the locale-prefixed fallback.
    pub fn redirect_target(
        &self,
        ctx: &RequestContext,
        redirect_to: Option<&str>,
    ) -> DeniedRedirect {
        let location = redirect_to
            .map(ToString::to_string)
            .unwrap_or_else(|| self.locale.fallback_url(ctx.locale.as_deref()));
        DeniedRedirect { location }
    }

    fn deny(&self, ctx: &RequestContext, redirect_to: Option<&str>) -> DeniedRedirect {
        let denied = self.redirect_target(ctx, redirect_to);
        debug!(location = %denied.location, request_id = %ctx.request_id, "route guard denied; redirecting");
        denied
    }

    /// Require an authenticated session; redirect otherwise.
    pub async fn require_auth(
        &self,
        ctx: &RequestContext,
        redirect_to: Option<&str>,
    ) -> Result<Session, DeniedRedirect> {
        let session = fail_closed("require_auth", None, async {
            Ok(self.collaborator.get_session(ctx).await?)
        })
        .await;
        session.ok_or_else(|| self.deny(ctx, redirect_to))
    }

    /// Require a role (exact or substring match); redirect otherwise.
    pub async fn require_role(
        &self,
        ctx: &RequestContext,
        target: &str,
        redirect_to: Option<&str>,
    ) -> Result<Session, DeniedRedirect> {
        let session = self.require_auth(ctx, redirect_to).await?;
        if self.has_role(ctx, target).await {
            Ok(session)
        } else {
            Err(self.deny(ctx, redirect_to))
        }
    }

    /// Require a minimum hierarchy level; redirect otherwise.
    pub async fn require_min_role(
        &self,
        ctx: &RequestContext,
        minimum: BusinessRole,
        redirect_to: Option<&str>,
    ) -> Result<Session, DeniedRedirect> {
        let session = self.require_auth(ctx, redirect_to).await?;
        if self.has_min_role(ctx, minimum).await {
            Ok(session)
        } else {
            Err(self.deny(ctx, redirect_to))
        }
    }

    /// Require a permission statement; redirect otherwise.
    pub async fn require_permissions(
        &self,
        ctx: &RequestContext,
        statement: &PermissionStatement,
        redirect_to: Option<&str>,
    ) -> Result<Session, DeniedRedirect> {
        let session = self.require_auth(ctx, redirect_to).await?;
        if self.has_permission(ctx, statement).await {
            Ok(session)
        } else {
            Err(self.deny(ctx, redirect_to))
        }
    }

    /// Require at least one of several statements; redirect otherwise.
    pub async fn require_any_permission(
        &self,
        ctx: &RequestContext,
        statements: &[PermissionStatement],
        redirect_to: Option<&str>,
    ) -> Result<Session, DeniedRedirect> {
        let session = self.require_auth(ctx, redirect_to).await?;
        if self.has_any_permission(ctx, statements).await {
            Ok(session)
        } else {
            Err(self.deny(ctx, redirect_to))
        }
    }

    /// Require the TEAM_MANAGEMENT permission set.
    pub async fn require_team_management(
        &self,
        ctx: &RequestContext,
        redirect_to: Option<&str>,
    ) -> Result<Session, DeniedRedirect> {
        self.require_permissions(
            ctx,
            &BusinessPermission::TeamManagement.statement(),
            redirect_to,
        )
        .await
    }

    /// Require the ORG_MANAGEMENT permission set.
    pub async fn require_organization_management(
        &self,
        ctx: &RequestContext,
        redirect_to: Option<&str>,
    ) -> Result<Session, DeniedRedirect> {
        self.require_permissions(
            ctx,
            &BusinessPermission::OrgManagement.statement(),
            redirect_to,
        )
        .await
    }

    /// Require the BILLING_MANAGEMENT permission set.
    pub async fn require_billing_management(
        &self,
        ctx: &RequestContext,
        redirect_to: Option<&str>,
    ) -> Result<Session, DeniedRedirect> {
        self.require_permissions(
            ctx,
            &BusinessPermission::BillingManagement.statement(),
            redirect_to,
        )
        .await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{CollaboratorError, StaticCollaborator};
    use crate::envelope::MemberReply;
    use async_trait::async_trait;
    use axum::http::{header, HeaderMap};

    /// A collaborator whose every call fails, simulating an outage.
    struct FailingCollaborator;

    #[async_trait]
    impl AuthCollaborator for FailingCollaborator {
        async fn get_session(
            &self,
            _ctx: &RequestContext,
        ) -> Result<Option<Session>, CollaboratorError> {
            Err(CollaboratorError::Unavailable("connection refused".into()))
        }

        async fn get_active_member(
            &self,
            _ctx: &RequestContext,
        ) -> Result<MemberReply, CollaboratorError> {
            Err(CollaboratorError::Unavailable("connection refused".into()))
        }

        async fn check_permission(
            &self,
            _ctx: &RequestContext,
            _statement: &PermissionStatement,
        ) -> Result<bool, CollaboratorError> {
            Err(CollaboratorError::Unavailable("connection refused".into()))
        }
    }

    fn ctx_with_token(token: &str) -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        RequestContext::from_headers(headers)
    }

    fn business_gate() -> Gate<StaticCollaborator> {
        let collab = StaticCollaborator::with_business_defaults();
        collab.register_actor("tok-owner", "olivia", "owner", "org-1");
        collab.register_actor("tok-admin", "alice", "admin", "org-1");
        collab.register_actor("tok-pm", "pat", "projectManager", "org-1");
        collab.register_actor("tok-fin", "fran", "finance", "org-1");
        collab.register_actor("tok-mem", "mia", "member", "org-1");
        Gate::new(collab, LocaleConfig::default())
    }

    #[tokio::test]
    async fn test_is_authenticated() {
        let gate = business_gate();
        assert!(gate.is_authenticated(&ctx_with_token("tok-mem")).await);
        assert!(!gate.is_authenticated(&RequestContext::ambient()).await);
    }

    #[tokio::test]
    async fn test_current_role() {
        let gate = business_gate();
        assert_eq!(
            gate.current_role(&ctx_with_token("tok-pm")).await.as_deref(),
            Some("projectManager")
        );
        assert_eq!(gate.current_role(&RequestContext::ambient()).await, None);
    }

    #[tokio::test]
    async fn test_has_role_exact_and_substring() {
        let gate = business_gate();
        assert!(gate.has_role(&ctx_with_token("tok-admin"), "admin").await);
        assert!(!gate.has_role(&ctx_with_token("tok-mem"), "admin").await);

        // Substring looseness carried through the gate.
        let collab = StaticCollaborator::new();
        collab.register_actor("tok-super", "sam", "superadmin", "org-1");
        let gate = Gate::new(collab, LocaleConfig::default());
        assert!(gate.has_role(&ctx_with_token("tok-super"), "admin").await);
    }

    #[tokio::test]
    async fn test_has_any_role() {
        let gate = business_gate();
        let ctx = ctx_with_token("tok-fin");
        assert!(gate.has_any_role(&ctx, &["admin", "finance"]).await);
        assert!(!gate.has_any_role(&ctx, &["admin", "owner"]).await);
        assert!(!gate.has_any_role(&RequestContext::ambient(), &["admin"]).await);
    }

    #[tokio::test]
    async fn test_has_min_role_hierarchy() {
        let gate = business_gate();
        assert!(
            gate.has_min_role(&ctx_with_token("tok-owner"), BusinessRole::Admin)
                .await
        );
        assert!(
            !gate
                .has_min_role(&ctx_with_token("tok-pm"), BusinessRole::Admin)
                .await
        );
        assert!(
            gate.has_min_role(&ctx_with_token("tok-pm"), BusinessRole::Finance)
                .await
        );
    }

    #[tokio::test]
    async fn test_business_wrappers() {
        let gate = business_gate();
        assert!(gate.can_manage_team(&ctx_with_token("tok-pm")).await);
        assert!(!gate.can_manage_team(&ctx_with_token("tok-fin")).await);
        assert!(gate.can_manage_billing(&ctx_with_token("tok-fin")).await);
        assert!(gate.can_manage_billing(&ctx_with_token("tok-admin")).await);
        assert!(!gate.can_manage_billing(&ctx_with_token("tok-mem")).await);
        assert!(gate.can_manage_org(&ctx_with_token("tok-admin")).await);
        assert!(!gate.can_manage_org(&ctx_with_token("tok-pm")).await);
    }

    #[tokio::test]
    async fn test_has_any_permission() {
        let gate = business_gate();
        let statements = [
            BusinessPermission::OrgManagement.statement(),
            BusinessPermission::BillingManagement.statement(),
        ];
        // Finance fails ORG_MANAGEMENT but passes BILLING_MANAGEMENT.
        assert!(
            gate.has_any_permission(&ctx_with_token("tok-fin"), &statements)
                .await
        );
        assert!(
            !gate
                .has_any_permission(&ctx_with_token("tok-mem"), &statements)
                .await
        );
    }

    #[tokio::test]
    async fn test_collaborator_outage_fails_closed() {
        let gate = Gate::new(FailingCollaborator, LocaleConfig::default());
        let ctx = RequestContext::ambient();
        let stmt = BusinessPermission::TeamManagement.statement();

        // Booleans resolve to denial rather than erroring.
        assert!(!gate.has_permission(&ctx, &stmt).await);
        assert!(!gate.has_role(&ctx, "owner").await);
        assert!(!gate.is_authenticated(&ctx).await);
        assert_eq!(gate.current_role(&ctx).await, None);

        // Guards resolve to the redirect.
        let denied = gate.require_auth(&ctx, None).await.unwrap_err();
        assert_eq!(denied.location, "/en/dashboard");
    }

    #[tokio::test]
    async fn test_require_auth_and_redirect_targets() {
        let gate = business_gate();

        let session = gate
            .require_auth(&ctx_with_token("tok-mem"), None)
            .await
            .unwrap();
        assert_eq!(session.user.id, "mia");

        // Default locale-prefixed fallback.
        let denied = gate
            .require_auth(&RequestContext::ambient(), None)
            .await
            .unwrap_err();
        assert_eq!(denied.location, "/en/dashboard");

        // Context locale wins over the default.
        let denied = gate
            .require_auth(&RequestContext::ambient().with_locale("de"), None)
            .await
            .unwrap_err();
        assert_eq!(denied.location, "/de/dashboard");

        // An explicit target wins over everything.
        let denied = gate
            .require_auth(&RequestContext::ambient(), Some("/en/login"))
            .await
            .unwrap_err();
        assert_eq!(denied.location, "/en/login");
    }

    #[tokio::test]
    async fn test_require_role_and_min_role() {
        let gate = business_gate();

        assert!(gate
            .require_role(&ctx_with_token("tok-admin"), "admin", None)
            .await
            .is_ok());
        assert!(gate
            .require_role(&ctx_with_token("tok-mem"), "admin", None)
            .await
            .is_err());

        assert!(gate
            .require_min_role(&ctx_with_token("tok-owner"), BusinessRole::Admin, None)
            .await
            .is_ok());
        assert!(gate
            .require_min_role(&ctx_with_token("tok-pm"), BusinessRole::Admin, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_require_business_wrappers() {
        let gate = business_gate();

        assert!(gate
            .require_team_management(&ctx_with_token("tok-pm"), None)
            .await
            .is_ok());
        assert!(gate
            .require_team_management(&ctx_with_token("tok-fin"), None)
            .await
            .is_err());

        assert!(gate
            .require_billing_management(&ctx_with_token("tok-fin"), None)
            .await
            .is_ok());

        assert!(gate
            .require_organization_management(&ctx_with_token("tok-admin"), None)
            .await
            .is_ok());
        assert!(gate
            .require_organization_management(&ctx_with_token("tok-pm"), None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_require_any_permission() {
        let gate = business_gate();
        let statements = vec![
            BusinessPermission::OrgManagement.statement(),
            BusinessPermission::BillingManagement.statement(),
        ];

        assert!(gate
            .require_any_permission(&ctx_with_token("tok-fin"), &statements, None)
            .await
            .is_ok());
        assert!(gate
            .require_any_permission(&ctx_with_token("tok-mem"), &statements, None)
            .await
            .is_err());
    }
}
