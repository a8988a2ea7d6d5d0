//! Error handling for the RBAC decision layer.
//!
//! Nothing in this layer is fatal: the worst outcome of any failure is a
//! denied action or a redirect to a fallback page. The taxonomy still
//! distinguishes *why* a check could not be answered (collaborator
//! unavailable, malformed reply, missing authentication) so logs and
//! metrics stay actionable even though every path resolves fail-closed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// A specialized Result type for RBAC operations.
pub type Result<T> = std::result::Result<T, RbacError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    CollaboratorUnavailable,
    MalformedResponse,
    ConfigurationError,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::CollaboratorUnavailable => "COLLABORATOR_UNAVAILABLE",
            Self::MalformedResponse => "MALFORMED_RESPONSE",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors surfaced by the RBAC layer.
#[derive(Debug, Error)]
pub enum RbacError {
    /// No authenticated session was available for the check.
    #[error("No authenticated session")]
    Unauthenticated,

    /// The actor is authenticated but does not satisfy the requirement.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The authorization collaborator could not be reached or errored.
    #[error("Authorization collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// The collaborator replied with data not matching the expected envelope.
    #[error("Malformed collaborator response: {0}")]
    MalformedResponse(String),

    /// The layer itself is misconfigured (bad base URL, etc).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RbacError {
    /// The machine-readable code for this error.
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthenticated => ErrorCode::Unauthorized,
            Self::PermissionDenied(_) => ErrorCode::Forbidden,
            Self::CollaboratorUnavailable(_) => ErrorCode::CollaboratorUnavailable,
            Self::MalformedResponse(_) => ErrorCode::MalformedResponse,
            Self::Configuration(_) => ErrorCode::ConfigurationError,
        }
    }

    /// The HTTP status this error maps to when surfaced as a response.
    ///
    /// Collaborator failures map to 403, not 5xx: the fail-closed policy
    /// presents an unanswerable check as a denial.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied(_)
            | Self::CollaboratorUnavailable(_)
            | Self::MalformedResponse(_) => StatusCode::FORBIDDEN,
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing message; internal detail stays in logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Authentication is required",
            Self::PermissionDenied(_) => "You do not have permission to perform this action",
            Self::CollaboratorUnavailable(_) | Self::MalformedResponse(_) => {
                "You do not have permission to perform this action"
            }
            Self::Configuration(_) => "An internal authorization error occurred",
        }
    }
}

impl IntoResponse for RbacError {
    fn into_response(self) -> Response {
        let code = self.code();

        counter!(
            "rbac_errors_total",
            "error_code" => code.as_str().to_string()
        )
        .increment(1);

        warn!(error_code = code.as_str(), error = %self, "RBAC error surfaced as response");

        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": code.as_str(),
                "message": self.public_message(),
            }
        });

        (self.status(), Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
