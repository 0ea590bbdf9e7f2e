//! External directory graph client.
//!
//! HTTP client for the external directory's graph API: group lookup by
//! display name and the direct-membership check the membership resolver
//! uses at external edges. Authenticates with an OAuth2 client-credentials
//! grant per request.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crewbase_directory::{DirectoryError, ExternalDirectory, OriginId};

use super::config::ExternalGraphConfig;

/// External directory graph client.
#[derive(Clone)]
pub struct ExternalGraphClient {
    /// HTTP client instance.
    client: Client,

    /// Graph endpoint and credential configuration.
    config: ExternalGraphConfig,
}

impl ExternalGraphClient {
    /// Create a new external graph client.
    pub fn new(config: ExternalGraphConfig, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, config }
    }

    /// Look up an external group's id by display name.
    ///
    /// Returns `None` when no group matches.
    #[instrument(skip(self), fields(group = %name))]
    pub async fn group_id_by_display_name(
        &self,
        name: &str,
    ) -> Result<Option<OriginId>, DirectoryError> {
        let token = self.access_token().await?;
        let url = format!("{}/groups", self.config.graph_url.trim_end_matches('/'));
        let filter = format!("displayName eq '{}'", name);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&[("$filter", filter.as_str())])
            .send()
            .await
            .map_err(transport)?;

        let list: GraphList<DirectoryObject> = handle_response(response).await?;
        Ok(list.value.into_iter().next().map(|g| OriginId::new(g.id)))
    }

    /// Check whether `target` is a direct member of the external group.
    ///
    /// Scans the group's first member page, as the membership contract is
    /// direct-only; nested external groups are never walked.
    #[instrument(skip(self), fields(group = %group, target = %target))]
    pub async fn is_direct_member(
        &self,
        group: &OriginId,
        target: &OriginId,
    ) -> Result<bool, DirectoryError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/groups/{}/members",
            self.config.graph_url.trim_end_matches('/'),
            group.as_str()
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(transport)?;

        let list: GraphList<DirectoryObject> = handle_response(response).await?;
        let hit = list.value.iter().any(|member| member.id == target.as_str());
        debug!(members = list.value.len(), hit, "Checked direct external membership");
        Ok(hit)
    }

    /// Fetch a bearer token with the client-credentials grant.
    async fn access_token(&self) -> Result<String, DirectoryError> {
        let secret = self.config.client_secret.as_deref().ok_or_else(|| {
            DirectoryError::Transport("External directory client secret is not configured".to_string())
        })?;

        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("scope", self.config.scope.as_str()),
            ("client_secret", secret),
            ("grant_type", "client_credentials"),
        ];
        let response = self
            .client
            .post(&self.config.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(transport)?;

        let token: TokenResponse = handle_response(response).await?;
        if token.access_token.is_empty() {
            return Err(DirectoryError::Transport(
                "External directory token endpoint returned an empty token".to_string(),
            ));
        }
        Ok(token.access_token)
    }
}

#[async_trait]
impl ExternalDirectory for ExternalGraphClient {
    async fn is_direct_member(
        &self,
        group: &OriginId,
        target: &OriginId,
    ) -> Result<bool, DirectoryError> {
        ExternalGraphClient::is_direct_member(self, group, target).await
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Generic graph list envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct GraphList<T> {
    #[serde(default)]
    value: Vec<T>,
}

/// A directory object with just the id the engine needs.
#[derive(Debug, Deserialize)]
struct DirectoryObject {
    id: String,
}

fn transport(e: reqwest::Error) -> DirectoryError {
    DirectoryError::Transport(e.to_string())
}

/// Handle a graph API response and parse JSON.
async fn handle_response<T>(response: reqwest::Response) -> Result<T, DirectoryError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();

    if !status.is_success() {
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        warn!(status = status.as_u16(), "External graph API error");
        return Err(DirectoryError::Remote {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| DirectoryError::Transport(e.to_string()))
}
