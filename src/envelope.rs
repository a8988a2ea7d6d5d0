//! Normalization of authorization-collaborator replies.
//!
//! The collaborator's wire replies are loosely shaped: a member lookup
//! arrives as `{ "data": { "role": "...", ... } }`, a permission check as
//! either `{ "success": bool }` or a bare truthy/falsy value, and errors as
//! whatever the transport produced. The helpers here turn those shapes into
//! `Option`s, `bool`s, and the tagged [`MemberReply`] so everything above
//! this seam is an exhaustive match instead of optional-chaining guesses.
//!
//! Every top-level check composes through [`fail_closed`]: any unexpected
//! failure resolves to the fallback (deny) rather than propagating.

use metrics::counter;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use tracing::warn;

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// Tagged member reply
// ═══════════════════════════════════════════════════════════════════════════════

/// The normalized outcome of a member lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberReply {
    /// The actor has a membership with the given role string.
    Member { role: String },
    /// The collaborator answered, but no membership (or no role) was found.
    Absent,
    /// The collaborator reported an error envelope.
    Failed(String),
}

impl MemberReply {
    /// Classify a raw collaborator reply.
    pub fn from_value(value: &Value) -> Self {
        if let Some(err) = value.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("collaborator reported an error")
                .to_string();
            return Self::Failed(message);
        }
        match extract_role_from_member_data(value) {
            Some(role) => Self::Member { role },
            None => Self::Absent,
        }
    }

    /// The role, if this reply carries one.
    pub fn role(&self) -> Option<&str> {
        match self {
            Self::Member { role } => Some(role),
            Self::Absent | Self::Failed(_) => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Wire-edge helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Defensively read `data.role` out of a member-lookup reply.
///
/// Any missing or malformed shape yields `None`: "no role known", never
/// an error.
pub fn extract_role_from_member_data(value: &Value) -> Option<String> {
    value
        .get("data")?
        .get("role")?
        .as_str()
        .map(ToString::to_string)
}

/// Does an extracted role string satisfy a target role?
///
/// True on exact equality OR when the extracted role textually contains the
/// target as a substring. The substring branch means `"superadmin"`
/// satisfies a target of `"admin"`; this looseness is preserved deliberately
/// pending clarified product intent (see DESIGN.md) and is pinned by a
/// regression test.
pub fn validate_user_role(extracted: &str, target: &str) -> bool {
    extracted == target || extracted.contains(target)
}

/// Normalize a permission-check reply to a boolean.
///
/// Honors a `success` field when present; otherwise the whole value is
/// coerced. Both `{ "success": true }` and a bare `true` must be supported.
pub fn handle_permission_response(value: &Value) -> bool {
    match value.get("success") {
        Some(success) => json_truthy(success),
        None => json_truthy(value),
    }
}

/// JSON-value truthiness, mirroring the collaborator's JS-side coercion:
/// `null`, `false`, `0`, and `""` are false; objects and arrays are true
/// even when empty.
pub fn json_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Fail-closed
// ═══════════════════════════════════════════════════════════════════════════════

/// Log a failed check under its operation label and return the fallback.
///
/// Accepts any displayable error shape and never panics.
pub fn handle_rbac_error<T>(operation: &str, error: &dyn fmt::Display, fallback: T) -> T {
    warn!(operation, error = %error, "authorization check failed; failing closed");
    counter!(
        "rbac_fail_closed_total",
        "operation" => operation.to_string()
    )
    .increment(1);
    fallback
}

/// Run a fallible check and resolve any error to `fallback`.
///
/// The single fail-closed seam: every exported permission/role check
/// composes through here, so a transient collaborator outage or a malformed
/// reply resolves to "denied" instead of erroring the request.
pub async fn fail_closed<T, F>(operation: &str, fallback: T, fut: F) -> T
where
    F: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(value) => value,
        Err(e) => handle_rbac_error(operation, &e, fallback),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
