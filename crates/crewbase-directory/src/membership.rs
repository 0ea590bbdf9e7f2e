//! # Membership Resolution
//!
//! Transitive group membership across two federated identity systems: the
//! platform's native group graph and an external directory's group graph.
//! The resolver walks native groups depth-first and, at each edge backed by
//! the external directory, asks that directory one non-recursive question.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::descriptor::{DescriptorError, SubjectDescriptor};
use crate::identity::{GroupIdentity, OriginId, ScopeDescriptor, UserIdentity};

/// Errors from directory queries and membership resolution.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No group with the given display name is visible in the scope.
    #[error("Group '{0}' does not exist")]
    GroupNotFound(String),

    /// No entitlement matches the given principal name.
    #[error("User '{0}' has no entitlement in the organization")]
    UserNotFound(String),

    /// A descriptor could not be mapped back to an origin id.
    #[error("Could not get origin id for descriptor '{0}'")]
    OriginIdNotFound(SubjectDescriptor),

    /// A descriptor failed to decode.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// The backend answered with a non-success status.
    #[error("Directory request failed ({status}): {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Error message from the backend.
        message: String,
    },

    /// The backend could not be reached at all.
    #[error("Directory transport error: {0}")]
    Transport(String),
}

/// The native directory's group graph and entitlement surface.
///
/// Implemented over HTTP by `crewbase-security`; in-memory fakes implement
/// it for resolver tests.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Resolve a group display name to its descriptor.
    ///
    /// Searches groups visible in `scope` when `project_only` is set,
    /// organization-wide otherwise. The match is by exact display name;
    /// callers qualify names with any required prefix first.
    async fn group_descriptor(
        &self,
        scope: &ScopeDescriptor,
        name: &str,
        project_only: bool,
    ) -> Result<SubjectDescriptor, DirectoryError>;

    /// Map a group descriptor to its backend-neutral origin id.
    async fn group_origin_id(
        &self,
        scope: &ScopeDescriptor,
        descriptor: &SubjectDescriptor,
    ) -> Result<OriginId, DirectoryError>;

    /// List a group's direct member descriptors (the "down" direction).
    async fn direct_members(
        &self,
        group: &SubjectDescriptor,
    ) -> Result<Vec<SubjectDescriptor>, DirectoryError>;

    /// List the groups visible in a scope, or organization-wide.
    async fn groups(
        &self,
        scope: Option<&ScopeDescriptor>,
    ) -> Result<Vec<GroupIdentity>, DirectoryError>;

    /// Resolve a user principal name through the entitlement lookup.
    ///
    /// Returns the first matching entitlement; ordering between duplicate
    /// principal names is the platform's.
    async fn user_identity(&self, principal_name: &str) -> Result<UserIdentity, DirectoryError>;
}

/// The external directory's direct-membership surface.
#[async_trait]
pub trait ExternalDirectory: Send + Sync {
    /// Check whether `target` is a *direct* member of the external group
    /// with origin id `group`. Never walks nested external groups.
    async fn is_direct_member(
        &self,
        group: &OriginId,
        target: &OriginId,
    ) -> Result<bool, DirectoryError>;
}

/// One member edge in the native group graph, classified by origin tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEdge {
    /// A nested native group: the traversal descends into it.
    NativeGroup(SubjectDescriptor),

    /// A group backed by the external directory: checked with one
    /// non-recursive direct-membership query.
    ExternalGroup(SubjectDescriptor),

    /// A user or service entry. The traversal only follows group-shaped
    /// edges; leaf members are never compared against the target.
    Leaf(SubjectDescriptor),
}

impl MembershipEdge {
    /// Classify a member descriptor by its origin-system tag.
    pub fn classify(descriptor: SubjectDescriptor) -> Self {
        if descriptor.is_native_group() {
            Self::NativeGroup(descriptor)
        } else if descriptor.is_external_group() {
            Self::ExternalGroup(descriptor)
        } else {
            Self::Leaf(descriptor)
        }
    }
}

/// Transitive membership resolver over both directory backends.
///
/// The walk is strictly sequential: one outstanding backend request at a
/// time, since each step's fan-out depends on the previous result. A
/// visited set bounds the traversal on cyclic graphs; a cycle simply
/// converges (and yields `false` when no other path matches).
///
/// # Example
///
/// ```no_run
/// # use crewbase_directory::{MembershipResolver, ScopeDescriptor, SubjectDescriptor, OriginId};
/// # async fn check<G, X>(resolver: MembershipResolver<G, X>)
/// # -> Result<(), crewbase_directory::DirectoryError>
/// # where G: crewbase_directory::GroupDirectory, X: crewbase_directory::ExternalDirectory {
/// let scope = ScopeDescriptor::new("scp.AAAA");
/// let group = SubjectDescriptor::new("vssgp.Uy0xLTktMA");
/// let user = OriginId::new("5f6ac131-0d4f-4a35-9e07-72f00e27f4a4");
/// let is_member = resolver.is_member(&scope, &group, &user).await?;
/// # Ok(()) }
/// ```
pub struct MembershipResolver<G, X> {
    directory: G,
    external: X,
}

impl<G, X> MembershipResolver<G, X>
where
    G: GroupDirectory,
    X: ExternalDirectory,
{
    /// Create a resolver over the two backends.
    pub fn new(directory: G, external: X) -> Self {
        Self {
            directory,
            external,
        }
    }

    /// The native directory backend.
    pub fn directory(&self) -> &G {
        &self.directory
    }

    /// Check whether `target` is a transitive member of `group`.
    ///
    /// Terminal states: a group with no members (`false`), a positive
    /// external direct-membership hit (`true`), a positive hit through
    /// N ≥ 1 levels of native nesting (`true`), or exhaustion of the
    /// reachable graph (`false`). Leaf members are skipped — only group
    /// hierarchies are checked (see [`MembershipEdge::Leaf`]).
    #[instrument(skip(self, scope), fields(group = %group, target = %target))]
    pub async fn is_member(
        &self,
        scope: &ScopeDescriptor,
        group: &SubjectDescriptor,
        target: &OriginId,
    ) -> Result<bool, DirectoryError> {
        let mut visited: HashSet<SubjectDescriptor> = HashSet::new();
        let mut pending = vec![group.clone()];

        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                debug!(group = %current, "Skipping already-visited group");
                continue;
            }

            let members = self.directory.direct_members(&current).await?;
            debug!(group = %current, members = members.len(), "Fetched direct members");

            for member in members {
                match MembershipEdge::classify(member) {
                    MembershipEdge::ExternalGroup(descriptor) => {
                        let origin = self.directory.group_origin_id(scope, &descriptor).await?;
                        if self.external.is_direct_member(&origin, target).await? {
                            debug!(external = %descriptor, "Positive external membership hit");
                            return Ok(true);
                        }
                    }
                    MembershipEdge::NativeGroup(descriptor) => {
                        pending.push(descriptor);
                    }
                    MembershipEdge::Leaf(descriptor) => {
                        debug!(member = %descriptor, "Skipping leaf member");
                    }
                }
            }
        }

        Ok(false)
    }
}
