//! # Policy Application
//!
//! The driver that turns declarative permission templates into descriptor
//! resolution, bit computation, and ACE writes. Templates are applied as a
//! sequential loop — one remote call at a time — and the first failed
//! resolution or rejected write aborts the apply with an explicit error;
//! callers wanting log-and-skip behavior wrap individual calls instead.

use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crewbase_directory::{
    ExternalDirectory, GroupDirectory, GroupKind, GroupNaming, MembershipResolver, ProjectContext,
    SubjectDescriptor,
};
use crewbase_rights::{
    compute_bits, AccessBits, GroupScope, NamespaceCatalog, ObjectPermission, ProjectPermission,
};

use crate::acl::{AceWriter, AclStore, SecurityError};

/// Applies permission templates through the ACE writer and the directory.
///
/// Owns an [`AceWriter`], the two directory backends (via the membership
/// resolver), the namespace catalog, and the group naming policy. All
/// fields are cheap to construct per run; nothing here is process-global.
pub struct PolicyEngine<S, G, X> {
    writer: AceWriter<S>,
    resolver: MembershipResolver<G, X>,
    catalog: Arc<NamespaceCatalog>,
    naming: GroupNaming,
}

impl<S, G, X> PolicyEngine<S, G, X>
where
    S: AclStore,
    G: GroupDirectory,
    X: ExternalDirectory,
{
    /// Create an engine over the store and directory backends.
    pub fn new(
        store: S,
        directory: G,
        external: X,
        catalog: Arc<NamespaceCatalog>,
        naming: GroupNaming,
    ) -> Self {
        Self {
            writer: AceWriter::new(store, catalog.clone()),
            resolver: MembershipResolver::new(directory, external),
            catalog,
            naming,
        }
    }

    /// The underlying ACE writer.
    pub fn writer(&self) -> &AceWriter<S> {
        &self.writer
    }

    /// Grant a group explicit bits on a project-level token.
    ///
    /// The token is the prefix with the project id appended; the group is
    /// resolved in the project's scope (or organization-wide when
    /// `project_only` is unset).
    #[instrument(skip(self, project), fields(project = %project.name, group = %group_name))]
    pub async fn grant_on_project(
        &self,
        project: &ProjectContext,
        namespace_id: Uuid,
        token_prefix: &str,
        group_name: &str,
        bits: AccessBits,
        merge: bool,
        project_only: bool,
    ) -> Result<(), SecurityError> {
        let descriptor = self
            .resolver
            .directory()
            .group_descriptor(&project.scope_descriptor, group_name, project_only)
            .await?;
        let token = format!("{}{}", token_prefix, project.id);
        self.writer
            .upsert_entry(namespace_id, &token, &descriptor, bits, merge)
            .await
    }

    /// Apply a list of object-permission templates to one token.
    ///
    /// Each role is resolved to a descriptor according to its scope, its
    /// action names are translated to bits, and one entry is written with
    /// the template's merge flag. `permission_group` names the role-family
    /// group that `TeamRole` and `Group` scoped templates are resolved
    /// against.
    #[instrument(skip(self, project, roles), fields(project = %project.name, token = %token))]
    pub async fn apply_object_permissions(
        &self,
        project: &ProjectContext,
        namespace_id: Uuid,
        token: &str,
        roles: &[ObjectPermission],
        permission_group: Option<&str>,
    ) -> Result<(), SecurityError> {
        for role in roles {
            let descriptor = self.resolve_template_group(project, role, permission_group).await?;
            let bits = compute_bits(&self.catalog, namespace_id, &role.allow, &role.deny)?;
            self.writer
                .upsert_entry(namespace_id, token, &descriptor, bits, role.merge)
                .await?;
        }
        debug!(roles = roles.len(), "Applied object permissions");
        Ok(())
    }

    /// Apply project-level permission templates.
    ///
    /// For each template role and each of its namespace grants, computes
    /// the bits and writes a merged entry at the grant's token prefix plus
    /// the project id. `ProjectGroup` names are qualified as security
    /// groups per the naming policy; `OrganisationGroup` roles resolve
    /// organization-wide.
    #[instrument(skip(self, project, templates), fields(project = %project.name))]
    pub async fn apply_project_permissions(
        &self,
        project: &ProjectContext,
        templates: &[ProjectPermission],
    ) -> Result<(), SecurityError> {
        for role in templates {
            let name = role
                .group
                .as_deref()
                .ok_or(SecurityError::MissingTemplateGroup(scope_label(role.group_scope)))?;
            for grant in &role.namespaces {
                let bits =
                    compute_bits(&self.catalog, grant.namespace_id, &grant.allow, &grant.deny)?;
                let (group_name, project_only) = match role.group_scope {
                    GroupScope::OrganisationGroup => (name.to_string(), false),
                    GroupScope::ProjectGroup => (self.naming.security_name(name), true),
                    GroupScope::TeamRole | GroupScope::Group => (name.to_string(), true),
                };
                let token_prefix = grant.token_prefix.as_deref().unwrap_or_default();
                self.grant_on_project(
                    project,
                    grant.namespace_id,
                    token_prefix,
                    &group_name,
                    bits,
                    true,
                    project_only,
                )
                .await?;
            }
        }
        debug!(templates = templates.len(), "Applied project permissions");
        Ok(())
    }

    /// Grant a group a flat allow-list on a simple entity.
    ///
    /// Simple entities carry owner/contributor bundles rather than a full
    /// template; inheritance is disabled first when `inherit` is unset.
    #[instrument(skip(self, project), fields(project = %project.name, token = %token))]
    pub async fn apply_simple_entity(
        &self,
        project: &ProjectContext,
        namespace_id: Uuid,
        token: &str,
        group_name: &str,
        allow: &[String],
        inherit: bool,
    ) -> Result<(), SecurityError> {
        if !inherit {
            self.writer.disable_inheritance(namespace_id, token).await?;
        }

        let descriptor = self
            .resolver
            .directory()
            .group_descriptor(&project.scope_descriptor, group_name, true)
            .await?;
        let bits = compute_bits(&self.catalog, namespace_id, allow, &[])?;
        self.writer
            .upsert_entry(namespace_id, token, &descriptor, bits, true)
            .await
    }

    /// Check whether a user is a transitive member of a named group.
    ///
    /// Resolves the user through the entitlement lookup, qualifies the
    /// group name per the naming policy, resolves it in the project scope,
    /// and walks the federated membership graph.
    #[instrument(skip(self, project), fields(project = %project.name, user = %principal_name))]
    pub async fn is_user_member_of_group(
        &self,
        project: &ProjectContext,
        principal_name: &str,
        group_name: &str,
        kind: GroupKind,
    ) -> Result<bool, SecurityError> {
        let user = self.resolver.directory().user_identity(principal_name).await?;
        let qualified = self.naming.qualified_name(kind, group_name);
        let descriptor = self
            .resolver
            .directory()
            .group_descriptor(&project.scope_descriptor, &qualified, true)
            .await?;

        let is_member = self
            .resolver
            .is_member(&project.scope_descriptor, &descriptor, &user.origin_id)
            .await?;
        debug!(group = %qualified, is_member, "Resolved user membership");
        Ok(is_member)
    }

    async fn resolve_template_group(
        &self,
        project: &ProjectContext,
        role: &ObjectPermission,
        permission_group: Option<&str>,
    ) -> Result<SubjectDescriptor, SecurityError> {
        let directory = self.resolver.directory();
        let missing = || SecurityError::MissingTemplateGroup(scope_label(role.group_scope));
        match role.group_scope {
            GroupScope::ProjectGroup => {
                let name = role.group.as_deref().ok_or_else(missing)?;
                Ok(directory
                    .group_descriptor(&project.scope_descriptor, name, true)
                    .await?)
            }
            GroupScope::OrganisationGroup => {
                let name = role.group.as_deref().ok_or_else(missing)?;
                Ok(directory
                    .group_descriptor(&project.scope_descriptor, name, false)
                    .await?)
            }
            GroupScope::TeamRole => {
                let (prefix, name) = permission_group
                    .zip(role.group.as_deref())
                    .ok_or_else(missing)?;
                Ok(directory
                    .group_descriptor(
                        &project.scope_descriptor,
                        &format!("{}{}", prefix, name),
                        true,
                    )
                    .await?)
            }
            GroupScope::Group => {
                let name = permission_group.ok_or_else(missing)?;
                Ok(directory
                    .group_descriptor(&project.scope_descriptor, name, true)
                    .await?)
            }
        }
    }
}

fn scope_label(scope: GroupScope) -> &'static str {
    match scope {
        GroupScope::ProjectGroup => "ProjectGroup",
        GroupScope::OrganisationGroup => "OrganisationGroup",
        GroupScope::TeamRole => "TeamRole",
        GroupScope::Group => "Group",
    }
}
