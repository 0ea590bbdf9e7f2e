//! Service configuration for the security and directory clients.
//!
//! Provides centralized configuration for the organization API endpoints,
//! the external directory graph, credentials, and the group naming policy.
//! Configuration is loaded from environment variables with sensible
//! defaults for local development.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crewbase_directory::GroupNaming;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Endpoints and credentials for one organization.
///
/// The platform splits its API over three hosts: the core host (security
/// namespaces and ACLs), the graph host (groups and memberships), and the
/// entitlements host (user entitlements).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgEndpoints {
    /// Core organization URL (ACLs, security namespaces).
    pub organization_url: String,

    /// Graph host URL (groups, memberships).
    pub graph_url: String,

    /// Entitlements host URL (user entitlements).
    pub entitlements_url: String,

    /// Personal access token for the organization.
    pub personal_access_token: Option<String>,
}

impl OrgEndpoints {
    /// Build a full URL by appending a path to one of the base URLs.
    fn join(base: &str, path: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// URL under the core organization host.
    pub fn core(&self, path: &str) -> String {
        Self::join(&self.organization_url, path)
    }

    /// URL under the graph host.
    pub fn graph(&self, path: &str) -> String {
        Self::join(&self.graph_url, path)
    }

    /// URL under the entitlements host.
    pub fn entitlements(&self, path: &str) -> String {
        Self::join(&self.entitlements_url, path)
    }

    /// Check if a personal access token is configured.
    pub fn has_auth(&self) -> bool {
        self.personal_access_token.is_some()
    }
}

/// Configuration for the external directory's graph API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalGraphConfig {
    /// OAuth2 token endpoint for the client-credentials grant.
    pub token_endpoint: String,

    /// Application (client) id.
    pub client_id: String,

    /// Application client secret.
    pub client_secret: Option<String>,

    /// Requested token scope.
    pub scope: String,

    /// Graph API base URL.
    pub graph_url: String,
}

/// Configuration for all security and directory clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Organization API configuration.
    pub org: OrgEndpoints,

    /// External directory graph configuration.
    pub external: ExternalGraphConfig,

    /// Group naming prefix policy.
    pub naming: GroupNaming,

    /// Default request timeout in seconds.
    pub default_timeout_secs: u64,
}

impl Default for PlatformConfig {
    /// Returns default configuration suitable for local development.
    fn default() -> Self {
        Self {
            org: OrgEndpoints {
                organization_url: "http://localhost:8080/org".to_string(),
                graph_url: "http://localhost:8080/graph".to_string(),
                entitlements_url: "http://localhost:8080/entitlements".to_string(),
                personal_access_token: None,
            },
            external: ExternalGraphConfig {
                token_endpoint: "http://localhost:8081/oauth2/token".to_string(),
                client_id: String::new(),
                client_secret: None,
                scope: "https://graph.example.com/.default".to_string(),
                graph_url: "http://localhost:8081/v1.0".to_string(),
            },
            naming: GroupNaming::default(),
            default_timeout_secs: 30,
        }
    }
}

impl PlatformConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CREWBASE_ORG_URL`: core organization URL
    /// - `CREWBASE_GRAPH_URL`: graph host URL
    /// - `CREWBASE_ENTITLEMENTS_URL`: entitlements host URL
    /// - `CREWBASE_PAT`: personal access token
    /// - `CREWBASE_EXT_TOKEN_ENDPOINT`: external directory token endpoint
    /// - `CREWBASE_EXT_CLIENT_ID`: external directory client id
    /// - `CREWBASE_EXT_CLIENT_SECRET`: external directory client secret
    /// - `CREWBASE_EXT_SCOPE`: external directory token scope
    /// - `CREWBASE_EXT_GRAPH_URL`: external directory graph URL
    /// - `CREWBASE_SECURITY_GROUP_PREFIX`: security group name prefix
    /// - `CREWBASE_TEAM_GROUP_PREFIX`: team group name prefix
    /// - `CREWBASE_PRODUCT_GROUP_PREFIX`: product group name prefix
    /// - `CREWBASE_TIMEOUT_SECS`: request timeout in seconds (default: 30)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            org: OrgEndpoints {
                organization_url: std::env::var("CREWBASE_ORG_URL")
                    .unwrap_or(default.org.organization_url),
                graph_url: std::env::var("CREWBASE_GRAPH_URL").unwrap_or(default.org.graph_url),
                entitlements_url: std::env::var("CREWBASE_ENTITLEMENTS_URL")
                    .unwrap_or(default.org.entitlements_url),
                personal_access_token: std::env::var("CREWBASE_PAT").ok(),
            },
            external: ExternalGraphConfig {
                token_endpoint: std::env::var("CREWBASE_EXT_TOKEN_ENDPOINT")
                    .unwrap_or(default.external.token_endpoint),
                client_id: std::env::var("CREWBASE_EXT_CLIENT_ID")
                    .unwrap_or(default.external.client_id),
                client_secret: std::env::var("CREWBASE_EXT_CLIENT_SECRET").ok(),
                scope: std::env::var("CREWBASE_EXT_SCOPE").unwrap_or(default.external.scope),
                graph_url: std::env::var("CREWBASE_EXT_GRAPH_URL")
                    .unwrap_or(default.external.graph_url),
            },
            naming: GroupNaming {
                security_prefix: std::env::var("CREWBASE_SECURITY_GROUP_PREFIX")
                    .unwrap_or_default(),
                team_prefix: std::env::var("CREWBASE_TEAM_GROUP_PREFIX").unwrap_or_default(),
                product_prefix: std::env::var("CREWBASE_PRODUCT_GROUP_PREFIX").unwrap_or_default(),
            },
            default_timeout_secs: std::env::var("CREWBASE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.default_timeout_secs),
        }
    }

    /// Get the default request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    /// Validate that all required credentials are present for production.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.org.personal_access_token.is_none() {
            return Err(ConfigError::MissingEnvVar("CREWBASE_PAT".to_string()));
        }
        if self.external.client_secret.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "CREWBASE_EXT_CLIENT_SECRET".to_string(),
            ));
        }
        Ok(())
    }
}
