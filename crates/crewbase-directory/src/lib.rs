//! # Crewbase Directory
//!
//! Principal identity and group membership for the Crewbase platform.
//!
//! ## Overview
//!
//! The crewbase-directory crate handles:
//! - **Descriptors**: The opaque, prefixed identifiers the platform uses
//!   for every principal, and their decoding to security identifiers
//! - **Identities**: Typed group, user, and project identity records
//! - **Membership**: Transitive "is principal P a member of group G"
//!   resolution across the platform's native group graph and an external
//!   directory's group graph
//!
//! ## Federated membership
//!
//! Groups in the platform can contain other native groups, groups that are
//! backed by an external directory, and plain user entries. The membership
//! resolver walks the native graph depth-first and asks the external
//! directory a single, non-recursive question at each external edge:
//!
//! ```text
//! is_member(G, target)
//!   for each member m of G:
//!     native group    -> descend into m
//!     external group  -> external.is_direct_member(origin(m), target)?
//!     leaf (user)     -> skipped; only group hierarchies are walked
//! ```
//!
//! Backends are abstracted behind the [`GroupDirectory`] and
//! [`ExternalDirectory`] traits so the resolver can be exercised against
//! in-memory fakes; the HTTP implementations live in `crewbase-security`.

pub mod descriptor;
pub mod identity;
pub mod membership;

// Re-export main types for convenience
pub use descriptor::{DescriptorError, SubjectDescriptor, EXTERNAL_GROUP_TAG, NATIVE_GROUP_TAG};
pub use identity::{
    GroupIdentity, GroupKind, GroupNaming, OriginId, ProjectContext, ScopeDescriptor, UserIdentity,
};
pub use membership::{
    DirectoryError, ExternalDirectory, GroupDirectory, MembershipEdge, MembershipResolver,
};
