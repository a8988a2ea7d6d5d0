//! The authorization collaborator boundary.
//!
//! Sessions, organization membership, and permission evaluation are owned by
//! an external authentication service; this layer treats it as an opaque,
//! authoritative black box behind the [`AuthCollaborator`] trait. The
//! collaborator is always an explicit injected dependency, never a
//! module-level singleton, so tests substitute a fake without any
//! global-state tricks.
//!
//! Two concrete implementations ship with the crate:
//! - [`HttpCollaborator`]: reqwest-backed, in either request-credentialed
//!   mode (forwards the caller's headers) or ambient mode (a stored bearer
//!   token).
//! - [`StaticCollaborator`]: in-memory, for tests, local development, and
//!   embedding.

pub mod http;
pub mod memory;

pub use http::HttpCollaborator;
pub use memory::StaticCollaborator;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::envelope::MemberReply;
use crate::error::RbacError;
use crate::statement::PermissionStatement;

// ═══════════════════════════════════════════════════════════════════════════════
// Request context
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-call authentication context.
///
/// Carries the current request's headers (cookies, bearer tokens) so the
/// collaborator can authenticate the actor, plus a request id for log
/// correlation and an optional locale for redirect fallbacks.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Headers of the request on whose behalf checks run.
    pub headers: HeaderMap,
    /// Correlation id, propagated or generated.
    pub request_id: String,
    /// Locale for redirect fallbacks, when known.
    pub locale: Option<String>,
}

impl RequestContext {
    /// Build a context from request headers, propagating `X-Request-ID`
    /// when present.
    pub fn from_headers(headers: HeaderMap) -> Self {
        let request_id = headers
            .get("X-Request-ID")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            headers,
            request_id,
            locale: None,
        }
    }

    /// An empty context for ambient-credentialed collaborators.
    pub fn ambient() -> Self {
        Self {
            headers: HeaderMap::new(),
            request_id: Uuid::new_v4().to_string(),
            locale: None,
        }
    }

    /// Set the locale used for redirect fallbacks.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// The bearer token from the `Authorization` header, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer ").or_else(|| s.strip_prefix("bearer ")))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Read-only views
// ═══════════════════════════════════════════════════════════════════════════════

/// The authenticated user, as reported by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// An authenticated session.
///
/// Fetched fresh on every check; never cached by this layer (the
/// collaborator may cache on its side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: SessionUser,
    /// Collaborator-side session identifier.
    pub session_id: String,
    /// The organization the session is currently acting in, if any.
    pub active_organization_id: Option<String>,
    /// Session expiry, if the collaborator reports one.
    pub expires_at: Option<DateTime<Utc>>,
}

/// The minimal membership view this layer expects: at least a role string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorMembership {
    pub role: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Failures at the collaborator boundary.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Network or downstream failure while contacting the collaborator.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// The collaborator returned data not matching the expected envelope.
    #[error("malformed collaborator response: {0}")]
    MalformedResponse(String),

    /// The collaborator rejected the call's credentials outright.
    #[error("not authenticated")]
    Unauthenticated,
}

impl From<CollaboratorError> for RbacError {
    fn from(e: CollaboratorError) -> Self {
        match e {
            CollaboratorError::Unavailable(reason) => Self::CollaboratorUnavailable(reason),
            CollaboratorError::MalformedResponse(reason) => Self::MalformedResponse(reason),
            CollaboratorError::Unauthenticated => Self::Unauthenticated,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// The assumed contract of the external authorization collaborator.
///
/// Each method is a single attempt: no retries, no caching, no batching.
/// Callers above compose these through the fail-closed seam.
#[async_trait]
pub trait AuthCollaborator: Send + Sync {
    /// Retrieve the current session, or `None` when unauthenticated.
    async fn get_session(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<Session>, CollaboratorError>;

    /// Retrieve the actor's active organization membership.
    async fn get_active_member(
        &self,
        ctx: &RequestContext,
    ) -> Result<MemberReply, CollaboratorError>;

    /// Ask the collaborator whether the actor satisfies a permission
    /// statement. The allow/deny decision is authoritative on its side.
    async fn check_permission(
        &self,
        ctx: &RequestContext,
        statement: &PermissionStatement,
    ) -> Result<bool, CollaboratorError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
