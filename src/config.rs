//! Configuration management.

use serde::Deserialize;
use std::time::Duration;

use crate::telemetry::LoggingConfig;

/// Top-level configuration for the RBAC layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RbacConfig {
    /// Authorization collaborator configuration
    #[serde(default)]
    pub collaborator: CollaboratorConfig,

    /// Locale configuration for redirect fallbacks
    #[serde(default)]
    pub locale: LocaleConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where and how to reach the authorization collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorConfig {
    /// Base URL of the collaborator service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Session lookup endpoint path
    #[serde(default = "default_session_path")]
    pub session_path: String,

    /// Active-member lookup endpoint path
    #[serde(default = "default_member_path")]
    pub member_path: String,

    /// Permission evaluation endpoint path
    #[serde(default = "default_permission_path")]
    pub permission_path: String,

    /// Per-request timeout
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,

    /// Ambient bearer token; set only for the ambient-credentialed mode
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session_path: default_session_path(),
            member_path: default_member_path(),
            permission_path: default_permission_path(),
            timeout: default_timeout(),
            bearer_token: None,
        }
    }
}

/// Locale settings for redirect-on-deny route guards.
#[derive(Debug, Clone, Deserialize)]
pub struct LocaleConfig {
    /// Locale prefix used when the caller supplies none
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// Path (after the locale prefix) denied requests are redirected to
    #[serde(default = "default_fallback_path")]
    pub fallback_path: String,
}

impl LocaleConfig {
    /// The locale-prefixed fallback URL, e.g. `/en/dashboard`.
    pub fn fallback_url(&self, locale: Option<&str>) -> String {
        let locale = locale.unwrap_or(&self.default_locale);
        format!("/{}{}", locale, self.fallback_path)
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default_locale: default_locale(),
            fallback_path: default_fallback_path(),
        }
    }
}

// Default value functions
fn default_base_url() -> String { "http://localhost:3000/api/auth".to_string() }
fn default_session_path() -> String { "/get-session".to_string() }
fn default_member_path() -> String { "/organization/get-active-member".to_string() }
fn default_permission_path() -> String { "/organization/has-permission".to_string() }
fn default_timeout() -> Duration { Duration::from_secs(5) }
fn default_locale() -> String { "en".to_string() }
fn default_fallback_path() -> String { "/dashboard".to_string() }

impl RbacConfig {
    /// Load configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ROLEGATE").separator("__"))
            .build()?;

        let cfg: RbacConfig = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("ROLEGATE").separator("__"))
            .build()?;

        let cfg: RbacConfig = config.try_deserialize()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RbacConfig::default();
        assert_eq!(cfg.collaborator.timeout, Duration::from_secs(5));
        assert!(cfg.collaborator.bearer_token.is_none());
        assert_eq!(cfg.locale.default_locale, "en");
    }

    #[test]
    fn test_fallback_url() {
        let locale = LocaleConfig::default();
        assert_eq!(locale.fallback_url(None), "/en/dashboard");
        assert_eq!(locale.fallback_url(Some("de")), "/de/dashboard");
    }

    #[test]
    fn test_deserialize_with_overrides() {
        let cfg: RbacConfig = serde_json::from_value(serde_json::json!({
            "collaborator": {
                "base_url": "https://auth.internal/api/auth",
                "timeout": "10s",
                "bearer_token": "tok_123"
            },
            "locale": { "default_locale": "fr" }
        }))
        .unwrap();

        assert_eq!(cfg.collaborator.base_url, "https://auth.internal/api/auth");
        assert_eq!(cfg.collaborator.timeout, Duration::from_secs(10));
        assert_eq!(cfg.collaborator.bearer_token.as_deref(), Some("tok_123"));
        assert_eq!(cfg.locale.fallback_url(None), "/fr/dashboard");
        // Untouched sections keep their defaults.
        assert_eq!(cfg.collaborator.session_path, "/get-session");
    }
}
