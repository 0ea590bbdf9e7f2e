//! Organization API client.
//!
//! HTTP client for the platform's organization-level APIs: the security
//! namespace catalog, the group graph, user entitlements, and the ACL
//! endpoints. Implements [`GroupDirectory`] for the membership resolver and
//! [`AclStore`] for the ACE writer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crewbase_directory::{
    DirectoryError, GroupDirectory, GroupIdentity, OriginId, ScopeDescriptor, SubjectDescriptor,
    UserIdentity,
};
use crewbase_rights::SecurityNamespace;

use super::config::OrgEndpoints;
use crate::acl::{AccessControlEntry, AccessControlList, AclError, AclStore};

/// API version for the security endpoint family.
const SECURITY_API_VERSION: &str = "5.0";

/// API version for the graph and entitlement endpoint families.
const GRAPH_API_VERSION: &str = "5.1-preview.1";

/// Organization API client.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct OrgApiClient {
    /// HTTP client instance.
    client: Client,

    /// Organization endpoints and credentials.
    endpoints: OrgEndpoints,
}

impl OrgApiClient {
    /// Create a new organization API client.
    pub fn new(endpoints: OrgEndpoints, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, endpoints }
    }

    /// Fetch the full security namespace catalog.
    ///
    /// A one-shot organization-level read; failures propagate, there is no
    /// retry — callers construct the immutable catalog from the result.
    #[instrument(skip(self))]
    pub async fn security_namespaces(&self) -> Result<Vec<SecurityNamespace>, DirectoryError> {
        let url = self.endpoints.core("/_apis/securitynamespaces");
        let response = self
            .get(&url)
            .query(&[("api-version", SECURITY_API_VERSION)])
            .send()
            .await
            .map_err(transport)?;

        let list: ListResponse<SecurityNamespace> = handle_response(response).await?;
        debug!(namespaces = list.value.len(), "Loaded security namespaces");
        Ok(list.value)
    }

    /// List groups, scoped to a project or organization-wide.
    #[instrument(skip(self, scope))]
    pub async fn groups(
        &self,
        scope: Option<&ScopeDescriptor>,
    ) -> Result<Vec<GroupIdentity>, DirectoryError> {
        let url = self.endpoints.graph("/_apis/graph/groups");
        let mut request = self.get(&url).query(&[("api-version", GRAPH_API_VERSION)]);
        if let Some(scope) = scope {
            request = request.query(&[("scopeDescriptor", scope.as_str())]);
        }

        let response = request.send().await.map_err(transport)?;
        let list: ListResponse<GroupIdentity> = handle_response(response).await?;
        Ok(list.value)
    }

    /// Resolve a group display name to its descriptor.
    ///
    /// The match is by exact display name; callers qualify names with any
    /// required prefix first.
    #[instrument(skip(self, scope), fields(group = %name))]
    pub async fn group_descriptor(
        &self,
        scope: &ScopeDescriptor,
        name: &str,
        project_only: bool,
    ) -> Result<SubjectDescriptor, DirectoryError> {
        let scope = project_only.then_some(scope);
        let groups = self.groups(scope).await?;
        groups
            .into_iter()
            .find(|g| g.display_name == name)
            .map(|g| g.descriptor)
            .ok_or_else(|| DirectoryError::GroupNotFound(name.to_string()))
    }

    /// Map a group descriptor to its origin id within a project scope.
    #[instrument(skip(self, scope), fields(descriptor = %descriptor))]
    pub async fn group_origin_id(
        &self,
        scope: &ScopeDescriptor,
        descriptor: &SubjectDescriptor,
    ) -> Result<OriginId, DirectoryError> {
        let groups = self.groups(Some(scope)).await?;
        groups
            .into_iter()
            .find(|g| g.descriptor == *descriptor)
            .map(|g| g.origin_id)
            .ok_or_else(|| DirectoryError::OriginIdNotFound(descriptor.clone()))
    }

    /// List a group's direct member descriptors.
    #[instrument(skip(self), fields(group = %group))]
    pub async fn direct_members(
        &self,
        group: &SubjectDescriptor,
    ) -> Result<Vec<SubjectDescriptor>, DirectoryError> {
        let url = self
            .endpoints
            .graph(&format!("/_apis/graph/Memberships/{}", group.as_str()));
        let response = self
            .get(&url)
            .query(&[("direction", "down"), ("api-version", GRAPH_API_VERSION)])
            .send()
            .await
            .map_err(transport)?;

        let list: ListResponse<MembershipWire> = handle_response(response).await?;
        Ok(list.value.into_iter().map(|m| m.member_descriptor).collect())
    }

    /// Resolve a user principal through the entitlement lookup.
    ///
    /// Returns the first matching entitlement; ordering between duplicate
    /// principal names is the platform's.
    #[instrument(skip(self), fields(user = %principal_name))]
    pub async fn user_identity(&self, principal_name: &str) -> Result<UserIdentity, DirectoryError> {
        let url = self.endpoints.entitlements("/_apis/userentitlements");
        let filter = format!("(name eq '{}')", principal_name);
        let response = self
            .get(&url)
            .query(&[("$filter", filter.as_str()), ("api-version", GRAPH_API_VERSION)])
            .send()
            .await
            .map_err(transport)?;

        let list: EntitlementsResponse = handle_response(response).await?;
        let entitlement = list
            .members
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::UserNotFound(principal_name.to_string()))?;

        debug!("Retrieved entitlement for user");
        Ok(UserIdentity {
            principal_name: principal_name.to_string(),
            id: entitlement.id,
            descriptor: entitlement.user.descriptor,
            origin_id: entitlement.user.origin_id,
            last_accessed: entitlement.last_accessed_date,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.get(url))
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.post(url))
    }

    fn delete(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.delete(url))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.endpoints.personal_access_token {
            Some(pat) => request.basic_auth("", Some(pat)),
            None => request,
        }
    }
}

#[async_trait]
impl GroupDirectory for OrgApiClient {
    async fn group_descriptor(
        &self,
        scope: &ScopeDescriptor,
        name: &str,
        project_only: bool,
    ) -> Result<SubjectDescriptor, DirectoryError> {
        OrgApiClient::group_descriptor(self, scope, name, project_only).await
    }

    async fn group_origin_id(
        &self,
        scope: &ScopeDescriptor,
        descriptor: &SubjectDescriptor,
    ) -> Result<OriginId, DirectoryError> {
        OrgApiClient::group_origin_id(self, scope, descriptor).await
    }

    async fn direct_members(
        &self,
        group: &SubjectDescriptor,
    ) -> Result<Vec<SubjectDescriptor>, DirectoryError> {
        OrgApiClient::direct_members(self, group).await
    }

    async fn groups(
        &self,
        scope: Option<&ScopeDescriptor>,
    ) -> Result<Vec<GroupIdentity>, DirectoryError> {
        OrgApiClient::groups(self, scope).await
    }

    async fn user_identity(&self, principal_name: &str) -> Result<UserIdentity, DirectoryError> {
        OrgApiClient::user_identity(self, principal_name).await
    }
}

#[async_trait]
impl AclStore for OrgApiClient {
    async fn write_entry(
        &self,
        namespace_id: Uuid,
        token: &str,
        entry: &AccessControlEntry,
        merge: bool,
    ) -> Result<(), AclError> {
        let url = self
            .endpoints
            .core(&format!("/_apis/accesscontrolentries/{}", namespace_id));
        let body = SetEntriesRequest {
            token,
            merge,
            access_control_entries: vec![entry],
        };
        let response = self
            .post(&url)
            .query(&[("api-version", SECURITY_API_VERSION)])
            .json(&body)
            .send()
            .await
            .map_err(store_transport)?;

        check_store_status(response).await
    }

    async fn remove_entry(
        &self,
        namespace_id: Uuid,
        token: &str,
        identity_descriptor: &str,
    ) -> Result<(), AclError> {
        let url = self
            .endpoints
            .core(&format!("/_apis/accesscontrolentries/{}", namespace_id));
        let response = self
            .delete(&url)
            .query(&[
                ("token", token),
                ("descriptors", identity_descriptor),
                ("api-version", SECURITY_API_VERSION),
            ])
            .send()
            .await
            .map_err(store_transport)?;

        check_store_status(response).await
    }

    async fn remove_acl(
        &self,
        namespace_id: Uuid,
        token: &str,
        recurse: bool,
    ) -> Result<(), AclError> {
        let url = self
            .endpoints
            .core(&format!("/_apis/accesscontrollists/{}", namespace_id));
        let response = self
            .delete(&url)
            .query(&[("token", token), ("api-version", SECURITY_API_VERSION)])
            .query(&[("recurse", recurse)])
            .send()
            .await
            .map_err(store_transport)?;

        check_store_status(response).await
    }

    async fn read_acl(
        &self,
        namespace_id: Uuid,
        token: &str,
    ) -> Result<Option<AccessControlList>, AclError> {
        let url = self
            .endpoints
            .core(&format!("/_apis/accesscontrollists/{}", namespace_id));
        let response = self
            .get(&url)
            .query(&[("token", token), ("api-version", SECURITY_API_VERSION)])
            .send()
            .await
            .map_err(store_transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AclError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let list: ListResponse<AccessControlList> = response
            .json()
            .await
            .map_err(|e| AclError::Transport(e.to_string()))?;
        Ok(list.value.into_iter().next())
    }

    async fn write_acl(&self, namespace_id: Uuid, acl: &AccessControlList) -> Result<(), AclError> {
        let url = self
            .endpoints
            .core(&format!("/_apis/accesscontrollists/{}", namespace_id));
        let body = ListResponse {
            value: vec![acl.clone()],
        };
        let response = self
            .post(&url)
            .query(&[("api-version", SECURITY_API_VERSION)])
            .json(&body)
            .send()
            .await
            .map_err(store_transport)?;

        check_store_status(response).await
    }
}

/// Generic list envelope used by the organization API.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ListResponse<T> {
    #[serde(default)]
    value: Vec<T>,
}

/// Request body for the access-control-entries endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetEntriesRequest<'a> {
    token: &'a str,
    merge: bool,
    access_control_entries: Vec<&'a AccessControlEntry>,
}

/// One membership edge as returned by the graph memberships endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembershipWire {
    member_descriptor: SubjectDescriptor,
}

/// Entitlement lookup envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntitlementsResponse {
    #[serde(default)]
    members: Vec<EntitlementWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntitlementWire {
    id: Uuid,
    user: EntitlementUserWire,
    #[serde(default)]
    last_accessed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntitlementUserWire {
    descriptor: SubjectDescriptor,
    origin_id: OriginId,
}

fn transport(e: reqwest::Error) -> DirectoryError {
    DirectoryError::Transport(e.to_string())
}

fn store_transport(e: reqwest::Error) -> AclError {
    AclError::Transport(e.to_string())
}

/// Handle a directory API response and parse JSON.
async fn handle_response<T>(response: reqwest::Response) -> Result<T, DirectoryError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();

    if !status.is_success() {
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        warn!(status = status.as_u16(), "Organization API error");
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

/// Map a write response to an explicit store result.
async fn check_store_status(response: reqwest::Response) -> Result<(), AclError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        warn!(status = status.as_u16(), "ACL store rejected request");
        return Err(AclError::Rejected {
            status: status.as_u16(),
            message,
        });
    }
    Ok(())
}
