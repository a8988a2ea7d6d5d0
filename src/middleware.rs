//! Tower guards that gate routes on roles and permission statements.
//!
//! These are the declarative face of the gate: configure a requirement on a
//! layer, and requests that satisfy it flow through with an [`RbacContext`]
//! injected into extensions, while requests that do not are answered with a
//! 403 JSON envelope or a redirect. Guard evaluation consults the
//! collaborator per request and inherits the gate's fail-closed behavior:
//! a collaborator failure denies the request.
//!
//! Role lists use **exact membership** (an `owner` does not satisfy
//! `roles = ["admin"]`); use [`minimum_role_guard`] for hierarchy-level
//! checks.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::warn;

use crate::collaborator::{AuthCollaborator, RequestContext};
use crate::gate::Gate;
use crate::hierarchy::{has_role_level, BusinessRole};
use crate::statement::PermissionStatement;

// ═══════════════════════════════════════════════════════════════════════════════
// RBAC Context (extracted in handlers)
// ═══════════════════════════════════════════════════════════════════════════════

/// Authorization context injected by a guard for downstream handlers.
#[derive(Debug, Clone)]
pub struct RbacContext {
    /// The authenticated user id.
    pub user_id: String,
    /// The actor's role, when the guard needed to resolve it.
    pub role: Option<String>,
    /// The permission statement that was checked, if any.
    pub checked_statement: Option<PermissionStatement>,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RbacContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RbacContext>()
            .cloned()
            .ok_or_else(|| {
                let body = serde_json::json!({
                    "success": false,
                    "error": {
                        "code": "MISSING_RBAC_CONTEXT",
                        "message": "Authorization context not available. Ensure a guard layer is applied.",
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Requirement
// ═══════════════════════════════════════════════════════════════════════════════

/// What a guard demands of the actor. All configured parts must pass
/// independently: a statement AND a role list AND a minimum level combine
/// with logical AND.
#[derive(Debug, Clone, Default)]
struct Requirement {
    statement: Option<PermissionStatement>,
    roles: Vec<String>,
    /// Reserved semantic: both branches currently evaluate exact role
    /// membership identically (any-of). The flag is kept so callers that
    /// set it keep compiling if a distinct all-of mode lands later.
    require_all: bool,
    minimum_role: Option<BusinessRole>,
}

/// How a guard answers a request it denies.
#[derive(Debug, Clone)]
enum DenyBehavior {
    /// 403 with a JSON error envelope.
    Forbidden,
    /// Server-side redirect; `None` uses the gate's locale fallback.
    Redirect(Option<String>),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer that wraps services with a guard requirement.
///
/// # Example
///
/// ```rust,ignore
/// use rolegate::{Gate, PermissionGuardLayer, BusinessPermission};
///
/// let app = Router::new()
///     .route("/settings/team", post(update_team))
///     .layer(
///         PermissionGuardLayer::new(gate.clone())
///             .statement(BusinessPermission::TeamManagement.statement()),
///     );
/// ```
#[derive(Debug)]
pub struct PermissionGuardLayer<C> {
    gate: Gate<C>,
    requirement: Requirement,
    deny: DenyBehavior,
}

impl<C> Clone for PermissionGuardLayer<C> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            requirement: self.requirement.clone(),
            deny: self.deny.clone(),
        }
    }
}

impl<C: AuthCollaborator> PermissionGuardLayer<C> {
    /// A guard with no requirement beyond an authenticated session.
    pub fn new(gate: Gate<C>) -> Self {
        Self {
            gate,
            requirement: Requirement::default(),
            deny: DenyBehavior::Forbidden,
        }
    }

    /// Require a permission statement to be satisfied.
    pub fn statement(mut self, statement: PermissionStatement) -> Self {
        self.requirement.statement = Some(statement);
        self
    }

    /// Require the actor's role to be one of `roles` (exact membership).
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirement.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// See [`Requirement::require_all`]: currently behaves identically for
    /// both values; kept for forward compatibility.
    pub fn require_all(mut self, require_all: bool) -> Self {
        self.requirement.require_all = require_all;
        self
    }

    /// Require a minimum hierarchy level.
    pub fn minimum_role(mut self, minimum: BusinessRole) -> Self {
        self.requirement.minimum_role = Some(minimum);
        self
    }

    /// Answer denied requests with a redirect instead of a 403.
    ///
    /// `None` redirects to the gate's locale-prefixed fallback.
    pub fn redirect_on_deny(mut self, location: Option<&str>) -> Self {
        self.deny = DenyBehavior::Redirect(location.map(ToString::to_string));
        self
    }
}

impl<C, S> Layer<S> for PermissionGuardLayer<C> {
    type Service = PermissionGuardService<C, S>;

    fn layer(&self, inner: S) -> Self::Service {
        PermissionGuardService {
            inner,
            gate: self.gate.clone(),
            requirement: self.requirement.clone(),
            deny: self.deny.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Named specializations
// ═══════════════════════════════════════════════════════════════════════════════

/// Guard on exact role membership.
pub fn role_guard<C, I, S>(gate: Gate<C>, roles: I) -> PermissionGuardLayer<C>
where
    C: AuthCollaborator,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    PermissionGuardLayer::new(gate).roles(roles)
}

/// Guard on a minimum hierarchy level.
pub fn minimum_role_guard<C: AuthCollaborator>(
    gate: Gate<C>,
    minimum: BusinessRole,
) -> PermissionGuardLayer<C> {
    PermissionGuardLayer::new(gate).minimum_role(minimum)
}

/// Only the owner role passes.
pub fn owner_only<C: AuthCollaborator>(gate: Gate<C>) -> PermissionGuardLayer<C> {
    role_guard(gate, [BusinessRole::Owner.as_str()])
}

/// Only the admin role passes (exact membership; owners do not).
pub fn admin_only<C: AuthCollaborator>(gate: Gate<C>) -> PermissionGuardLayer<C> {
    role_guard(gate, [BusinessRole::Admin.as_str()])
}

/// ProjectManager level or above passes.
pub fn project_manager_access<C: AuthCollaborator>(gate: Gate<C>) -> PermissionGuardLayer<C> {
    minimum_role_guard(gate, BusinessRole::ProjectManager)
}

/// Finance level or above passes.
pub fn finance_access<C: AuthCollaborator>(gate: Gate<C>) -> PermissionGuardLayer<C> {
    minimum_role_guard(gate, BusinessRole::Finance)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Service that enforces a guard requirement per request.
#[derive(Debug)]
pub struct PermissionGuardService<C, S> {
    inner: S,
    gate: Gate<C>,
    requirement: Requirement,
    deny: DenyBehavior,
}

impl<C, S: Clone> Clone for PermissionGuardService<C, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            gate: self.gate.clone(),
            requirement: self.requirement.clone(),
            deny: self.deny.clone(),
        }
    }
}

impl<C, S> Service<Request<Body>> for PermissionGuardService<C, S>
where
    C: AuthCollaborator + 'static,
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        let requirement = self.requirement.clone();
        let deny = self.deny.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ctx = RequestContext::from_headers(request.headers().clone());

            let session = match gate.require_auth(&ctx, None).await {
                Ok(session) => session,
                Err(_) => {
                    return Ok(deny_response(&gate, &ctx, &deny, "Authentication required"));
                }
            };

            // Resolve the role once; both the role list and the minimum
            // level check reuse it.
            let role = if requirement.roles.is_empty() && requirement.minimum_role.is_none() {
                None
            } else {
                gate.current_role(&ctx).await
            };

            if !requirement.roles.is_empty() {
                let member_of = role
                    .as_deref()
                    .is_some_and(|r| requirement.roles.iter().any(|want| want == r));
                if !member_of {
                    warn!(
                        user_id = %session.user.id,
                        roles = ?requirement.roles,
                        actual = role.as_deref().unwrap_or("<none>"),
                        "role guard denied"
                    );
                    return Ok(deny_response(
                        &gate,
                        &ctx,
                        &deny,
                        "You do not have a required role",
                    ));
                }
            }

            if let Some(minimum) = requirement.minimum_role {
                let satisfied = role
                    .as_deref()
                    .is_some_and(|r| has_role_level(r, minimum));
                if !satisfied {
                    warn!(
                        user_id = %session.user.id,
                        minimum = %minimum,
                        actual = role.as_deref().unwrap_or("<none>"),
                        "minimum-role guard denied"
                    );
                    return Ok(deny_response(
                        &gate,
                        &ctx,
                        &deny,
                        "Your role does not meet the required level",
                    ));
                }
            }

            if let Some(statement) = &requirement.statement {
                if !gate.has_permission(&ctx, statement).await {
                    warn!(user_id = %session.user.id, "permission guard denied");
                    return Ok(deny_response(
                        &gate,
                        &ctx,
                        &deny,
                        "You do not have the required permission",
                    ));
                }
            }

            let rbac_ctx = RbacContext {
                user_id: session.user.id,
                role,
                checked_statement: requirement.statement,
            };
            request.extensions_mut().insert(rbac_ctx);

            inner.call(request).await
        })
    }
}

fn deny_response<C: AuthCollaborator>(
    gate: &Gate<C>,
    ctx: &RequestContext,
    deny: &DenyBehavior,
    message: &str,
) -> Response {
    match deny {
        DenyBehavior::Forbidden => forbidden_response(message),
        DenyBehavior::Redirect(location) => gate
            .redirect_target(ctx, location.as_deref())
            .into_response(),
    }
}

/// Build a 403 Forbidden JSON response.
fn forbidden_response(message: &str) -> Response {
    let body = serde_json::json!({
        "success": false,
        "error": {
            "code": "FORBIDDEN",
            "message": message,
        }
    });
    (StatusCode::FORBIDDEN, Json(body)).into_response()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
