//! HTTP-backed authorization collaborator.
//!
//! Talks to the external authentication service over its JSON API. Two
//! credential modes share one implementation:
//!
//! - **Request-credentialed**: forwards the caller's `Cookie` and
//!   `Authorization` headers, so every check runs as the current request's
//!   actor. This is the server-side gate mode.
//! - **Ambient**: attaches a configured bearer token and ignores per-request
//!   headers. This mirrors a browser-side client addressing the service with
//!   ambient credentials.
//!
//! Every call is a single attempt against the configured endpoints; retries
//! are left to the caller.

use async_trait::async_trait;
use axum::http::header;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{AuthCollaborator, CollaboratorError, RequestContext, Session, SessionUser};
use crate::config::CollaboratorConfig;
use crate::envelope::{handle_permission_response, MemberReply};
use crate::error::RbacError;
use crate::statement::PermissionStatement;

// ═══════════════════════════════════════════════════════════════════════════════
// Collaborator
// ═══════════════════════════════════════════════════════════════════════════════

/// Credential source for outgoing collaborator calls.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CredentialMode {
    /// Forward credentials from the current request's headers.
    Request,
    /// Use the configured ambient bearer token.
    Ambient(String),
}

/// Reqwest-backed implementation of [`AuthCollaborator`].
#[derive(Debug, Clone)]
pub struct HttpCollaborator {
    client: reqwest::Client,
    config: CollaboratorConfig,
    mode: CredentialMode,
}

impl HttpCollaborator {
    /// Request-credentialed collaborator: forwards the caller's headers.
    pub fn request_credentialed(config: CollaboratorConfig) -> Result<Self, RbacError> {
        let client = Self::build_client(&config)?;
        Ok(Self {
            client,
            config,
            mode: CredentialMode::Request,
        })
    }

    /// Ambient-credentialed collaborator: uses the configured bearer token.
    pub fn ambient(config: CollaboratorConfig) -> Result<Self, RbacError> {
        let token = config.bearer_token.clone().ok_or_else(|| {
            RbacError::Configuration(
                "ambient collaborator requires collaborator.bearer_token".to_string(),
            )
        })?;
        let client = Self::build_client(&config)?;
        Ok(Self {
            client,
            config,
            mode: CredentialMode::Ambient(token),
        })
    }

    fn build_client(config: &CollaboratorConfig) -> Result<reqwest::Client, RbacError> {
        reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RbacError::Configuration(format!("failed to build HTTP client: {e}")))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Attach credentials and the correlation id to an outgoing request.
    fn credentialed(
        &self,
        req: reqwest::RequestBuilder,
        ctx: &RequestContext,
    ) -> reqwest::RequestBuilder {
        let req = req.header("X-Request-ID", &ctx.request_id);
        match &self.mode {
            CredentialMode::Ambient(token) => req.bearer_auth(token),
            CredentialMode::Request => {
                // Forwarded as strings: the request side and reqwest use
                // different http crate major versions.
                let mut req = req;
                for name in [header::COOKIE, header::AUTHORIZATION] {
                    if let Some(value) = ctx.headers.get(&name).and_then(|v| v.to_str().ok()) {
                        req = req.header(name.as_str(), value);
                    }
                }
                req
            }
        }
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, CollaboratorError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Wire shapes
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct SessionWire {
    user: SessionUser,
    session: SessionDetailsWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionDetailsWire {
    id: String,
    #[serde(default)]
    active_organization_id: Option<String>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

impl From<SessionWire> for Session {
    fn from(wire: SessionWire) -> Self {
        Self {
            user: wire.user,
            session_id: wire.session.id,
            active_organization_id: wire.session.active_organization_id,
            expires_at: wire.session.expires_at,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Trait implementation
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl AuthCollaborator for HttpCollaborator {
    async fn get_session(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<Session>, CollaboratorError> {
        let response = self
            .credentialed(self.client.get(self.url(&self.config.session_path)), ctx)
            .send()
            .await
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CollaboratorError::Unavailable(format!(
                "session endpoint returned {status}"
            )));
        }

        let body = Self::read_json(response).await?;
        if body.is_null() {
            return Ok(None);
        }

        let wire: SessionWire = serde_json::from_value(body)
            .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))?;
        Ok(Some(wire.into()))
    }

    async fn get_active_member(
        &self,
        ctx: &RequestContext,
    ) -> Result<MemberReply, CollaboratorError> {
        let response = self
            .credentialed(self.client.get(self.url(&self.config.member_path)), ctx)
            .send()
            .await
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(CollaboratorError::Unavailable(format!(
                "member endpoint returned {status}"
            )));
        }

        // Client-error statuses still carry a classifiable envelope
        // (error shape or empty body), so classification handles them.
        let body = Self::read_json(response).await?;
        Ok(MemberReply::from_value(&body))
    }

    async fn check_permission(
        &self,
        ctx: &RequestContext,
        statement: &PermissionStatement,
    ) -> Result<bool, CollaboratorError> {
        let body = serde_json::json!({ "permissions": statement });
        let response = self
            .credentialed(
                self.client
                    .post(self.url(&self.config.permission_path))
                    .json(&body),
                ctx,
            )
            .send()
            .await
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(CollaboratorError::Unavailable(format!(
                "permission endpoint returned {status}"
            )));
        }
        if !status.is_success() {
            debug!(%status, "permission check rejected by collaborator");
            return Ok(false);
        }

        let body = Self::read_json(response).await?;
        Ok(handle_permission_response(&body))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> CollaboratorConfig {
        CollaboratorConfig {
            base_url: server.uri(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_session_happy_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "id": "u1", "email": "a@example.com", "name": "Alice" },
                "session": {
                    "id": "sess-1",
                    "activeOrganizationId": "org-1",
                    "expiresAt": "2030-01-01T00:00:00Z"
                }
            })))
            .mount(&server)
            .await;

        let collab = HttpCollaborator::request_credentialed(config_for(&server)).unwrap();
        let session = collab
            .get_session(&RequestContext::ambient())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(session.user.id, "u1");
        assert_eq!(session.session_id, "sess-1");
        assert_eq!(session.active_organization_id.as_deref(), Some("org-1"));
        assert!(session.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_get_session_null_and_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .mount(&server)
            .await;

        let collab = HttpCollaborator::request_credentialed(config_for(&server)).unwrap();
        assert!(collab
            .get_session(&RequestContext::ambient())
            .await
            .unwrap()
            .is_none());

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-session"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let collab = HttpCollaborator::request_credentialed(config_for(&server)).unwrap();
        assert!(collab
            .get_session(&RequestContext::ambient())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_get_session_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-session"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let collab = HttpCollaborator::request_credentialed(config_for(&server)).unwrap();
        let err = collab
            .get_session(&RequestContext::ambient())
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_get_active_member_role() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/organization/get-active-member"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "role": "finance", "userId": "u1" }
            })))
            .mount(&server)
            .await;

        let collab = HttpCollaborator::request_credentialed(config_for(&server)).unwrap();
        let reply = collab
            .get_active_member(&RequestContext::ambient())
            .await
            .unwrap();
        assert_eq!(reply, MemberReply::Member { role: "finance".into() });
    }

    #[tokio::test]
    async fn test_get_active_member_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/organization/get-active-member"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "no active organization" }
            })))
            .mount(&server)
            .await;

        let collab = HttpCollaborator::request_credentialed(config_for(&server)).unwrap();
        let reply = collab
            .get_active_member(&RequestContext::ambient())
            .await
            .unwrap();
        assert_eq!(reply, MemberReply::Failed("no active organization".into()));
    }

    #[tokio::test]
    async fn test_check_permission_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organization/has-permission"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .mount(&server)
            .await;

        let collab = HttpCollaborator::request_credentialed(config_for(&server)).unwrap();
        let stmt = PermissionStatement::new().grant("member", ["create"]);
        assert!(collab
            .check_permission(&RequestContext::ambient(), &stmt)
            .await
            .unwrap());

        // Bare boolean body.
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organization/has-permission"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(false)))
            .mount(&server)
            .await;

        let collab = HttpCollaborator::request_credentialed(config_for(&server)).unwrap();
        assert!(!collab
            .check_permission(&RequestContext::ambient(), &stmt)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_check_permission_denied_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organization/has-permission"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "success": false })))
            .mount(&server)
            .await;

        let collab = HttpCollaborator::request_credentialed(config_for(&server)).unwrap();
        let stmt = PermissionStatement::new().grant("organization", ["delete"]);
        assert!(!collab
            .check_permission(&RequestContext::ambient(), &stmt)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_check_permission_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organization/has-permission"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let collab = HttpCollaborator::request_credentialed(config_for(&server)).unwrap();
        let stmt = PermissionStatement::new().grant("member", ["create"]);
        let err = collab
            .check_permission(&RequestContext::ambient(), &stmt)
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_ambient_mode_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-session"))
            .and(header("Authorization", "Bearer tok_ambient"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        let config = CollaboratorConfig {
            base_url: server.uri(),
            bearer_token: Some("tok_ambient".to_string()),
            ..Default::default()
        };
        let collab = HttpCollaborator::ambient(config).unwrap();
        // Ambient mode ignores per-request headers entirely.
        let session = collab.get_session(&RequestContext::ambient()).await.unwrap();
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn test_request_mode_forwards_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-session"))
            .and(header("Cookie", "session=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        let collab = HttpCollaborator::request_credentialed(config_for(&server)).unwrap();
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(axum::http::header::COOKIE, "session=abc".parse().unwrap());
        let ctx = RequestContext::from_headers(headers);
        let session = collab.get_session(&ctx).await.unwrap();
        assert!(session.is_none());
    }

    #[test]
    fn test_ambient_requires_token() {
        let err = HttpCollaborator::ambient(CollaboratorConfig::default()).unwrap_err();
        assert!(matches!(err, RbacError::Configuration(_)));
    }
}
