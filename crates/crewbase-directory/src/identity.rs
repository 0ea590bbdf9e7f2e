//! # Identity Models
//!
//! Typed records for the principals and scopes the directory layer works
//! with, and the group naming policy callers use to qualify display names
//! before resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::descriptor::SubjectDescriptor;

/// Backend-neutral identifier correlating one logical principal across the
/// native directory and the external directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OriginId(String);

impl OriginId {
    /// Wrap a raw origin id.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw origin id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OriginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OriginId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Scope descriptor used to restrict directory queries to one project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ScopeDescriptor(String);

impl ScopeDescriptor {
    /// Wrap a raw scope descriptor.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw scope descriptor string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScopeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A group as returned by the directory's group queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupIdentity {
    /// Display name, the key callers resolve by.
    pub display_name: String,

    /// The group's descriptor.
    pub descriptor: SubjectDescriptor,

    /// The group's backend-neutral origin id.
    pub origin_id: OriginId,
}

/// A user identity as returned by the entitlement lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// The user principal name the lookup was keyed by.
    pub principal_name: String,

    /// Entitlement id.
    pub id: Uuid,

    /// The user's descriptor.
    pub descriptor: SubjectDescriptor,

    /// The user's backend-neutral origin id.
    pub origin_id: OriginId,

    /// When the user last accessed the organization, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
}

/// The slice of a provisioned project the access-control core needs.
///
/// Produced by the provisioning layer; the core never creates projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    /// Project id, appended to token prefixes.
    pub id: Uuid,

    /// Project name, used in logging only.
    pub name: String,

    /// The project's scope descriptor for scoped directory queries.
    pub scope_descriptor: ScopeDescriptor,
}

impl ProjectContext {
    /// Create a project context.
    pub fn new(id: Uuid, name: impl Into<String>, scope_descriptor: ScopeDescriptor) -> Self {
        Self {
            id,
            name: name.into(),
            scope_descriptor,
        }
    }
}

/// The kind of group a display name refers to, for prefix qualification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GroupKind {
    /// A team group, qualified with the team prefix.
    Team,

    /// A product group, qualified with the product prefix.
    Product,

    /// A project-level group, used verbatim.
    Project,

    /// An organization-wide group, used verbatim.
    Organisation,
}

/// Group naming prefix policy.
///
/// Display names in templates and membership queries are bare; the
/// organization's naming convention prepends a per-kind prefix before a
/// name is resolved against the directory. The policy is configuration,
/// consumed read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupNaming {
    /// Prefix for security groups.
    pub security_prefix: String,

    /// Prefix for team groups.
    pub team_prefix: String,

    /// Prefix for product groups.
    pub product_prefix: String,
}

impl GroupNaming {
    /// Qualify a display name for the given group kind.
    ///
    /// Project and organization groups are used verbatim.
    pub fn qualified_name(&self, kind: GroupKind, name: &str) -> String {
        match kind {
            GroupKind::Team => format!("{}{}", self.team_prefix, name),
            GroupKind::Product => format!("{}{}", self.product_prefix, name),
            GroupKind::Project | GroupKind::Organisation => name.to_string(),
        }
    }

    /// Qualify a display name as a security group.
    pub fn security_name(&self, name: &str) -> String {
        format!("{}{}", self.security_prefix, name)
    }
}
