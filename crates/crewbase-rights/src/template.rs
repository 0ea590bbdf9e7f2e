//! # Permission Templates
//!
//! Declarative permission records consumed by the policy application layer.
//! These are serde models for the platform's JSON template format (PascalCase
//! keys); the rights crate does not read files, it only gives the templates
//! a typed shape.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a template's group name is scoped when it is resolved to a descriptor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GroupScope {
    /// A group that lives in the project being provisioned.
    ProjectGroup,

    /// An organization-wide group.
    OrganisationGroup,

    /// A role group named by prefixing the template group with the
    /// permission group passed at apply time.
    TeamRole,

    /// The permission group passed at apply time, verbatim.
    Group,
}

/// One role's permissions on a securable object.
///
/// The record the policy layer feeds into the bit calculator and ACE
/// writer: a group reference, the action names to allow and deny, and
/// whether the resulting entry merges with or replaces the existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectPermission {
    /// Group display name; interpretation depends on `group_scope`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// How to resolve `group` to a descriptor.
    pub group_scope: GroupScope,

    /// Free-form template annotation, ignored by the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_notes: Option<String>,

    /// Whether to merge into an existing entry (default) or replace it.
    #[serde(default = "default_merge")]
    pub merge: bool,

    /// Action names to allow.
    #[serde(default)]
    pub allow: Vec<String>,

    /// Action names to deny.
    #[serde(default)]
    pub deny: Vec<String>,
}

/// Project-level permission template: one group across several namespaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectPermission {
    /// Group display name; interpretation depends on `group_scope`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// How to resolve `group` to a descriptor.
    pub group_scope: GroupScope,

    /// The namespaces this group receives rights in.
    pub namespaces: Vec<NamespaceGrant>,
}

/// One namespace's worth of rights inside a [`ProjectPermission`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamespaceGrant {
    /// Target namespace.
    pub namespace_id: Uuid,

    /// Template annotation, ignored by the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_description: Option<String>,

    /// Token prefix the project id is appended to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_prefix: Option<String>,

    /// Action names to allow.
    #[serde(default)]
    pub allow: Vec<String>,

    /// Action names to deny.
    #[serde(default)]
    pub deny: Vec<String>,
}

/// Named permission bundles for one resource category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRights {
    /// Action names granted to the owning group.
    pub owner_rights: Vec<String>,

    /// Action names granted to contributors.
    pub contributor_rights: Vec<String>,
}

/// Permission bundles per simple resource category.
///
/// "Simple" entities are secured with a flat owner/contributor split rather
/// than a full role template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimpleRights {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<ResourceRights>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<ResourceRights>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<ResourceRights>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_connection: Option<ResourceRights>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_group: Option<ResourceRights>,
}

fn default_merge() -> bool {
    true
}
