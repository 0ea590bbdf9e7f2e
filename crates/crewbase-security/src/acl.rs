//! # Access Control Lists
//!
//! ACE/ACL wire types, the store contract, and the [`AceWriter`] that
//! composes entries from descriptors and bitmasks. Writes are blind:
//! nothing is read back and diffed, so the only state is what the remote
//! store holds.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crewbase_directory::{DescriptorError, DirectoryError, SubjectDescriptor};
use crewbase_rights::{AccessBits, NamespaceCatalog, RightsError};

use crate::retry::{with_retry_if, RetryConfig};

/// Routing tag the ACL endpoints expect in front of a decoded security
/// identifier.
pub const IDENTITY_DESCRIPTOR_PREFIX: &str = "Microsoft.TeamFoundation.Identity;";

/// Errors from the ACL store.
#[derive(Debug, Error)]
pub enum AclError {
    /// The store answered a write or read with a non-success status.
    #[error("ACL request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message from the store.
        message: String,
    },

    /// No ACL was observed for a token within the propagation window.
    #[error("No ACL observed for token '{token}' after waiting for propagation")]
    NotReady {
        /// The token that was polled.
        token: String,
    },

    /// The store could not be reached at all.
    #[error("ACL store transport error: {0}")]
    Transport(String),
}

/// Top-level error for ACE composition and policy application.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Namespace or action resolution failed.
    #[error(transparent)]
    Rights(#[from] RightsError),

    /// A descriptor failed to decode.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// A directory query failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// An ACL store operation failed.
    #[error(transparent)]
    Acl(#[from] AclError),

    /// A permission template names a scope it provides no group for.
    #[error("Template does not name a group for scope {0}")]
    MissingTemplateGroup(&'static str),
}

/// One principal's allow/deny bits on a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlEntry {
    /// Identity descriptor: the routing tag plus the decoded SID.
    pub descriptor: String,

    /// Allowed bits.
    pub allow: u32,

    /// Denied bits.
    pub deny: u32,

    /// Opaque per-entry metadata; sent empty.
    #[serde(default)]
    pub extended_info: HashMap<String, serde_json::Value>,
}

impl AccessControlEntry {
    /// Build an entry from a subject descriptor and a bit pair.
    ///
    /// The descriptor is decoded to its SID and re-prefixed with the fixed
    /// routing tag the ACL endpoints expect.
    pub fn for_subject(
        descriptor: &SubjectDescriptor,
        bits: AccessBits,
    ) -> Result<Self, DescriptorError> {
        Ok(Self {
            descriptor: identity_descriptor(descriptor)?,
            allow: bits.allow,
            deny: bits.deny,
            extended_info: HashMap::new(),
        })
    }
}

/// The full set of entries for one (namespace, token), plus inheritance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlList {
    /// The secured object's token.
    pub token: String,

    /// Whether the token inherits entries from ancestor tokens.
    pub inherit_permissions: bool,

    /// Entries keyed by identity descriptor.
    #[serde(default)]
    pub aces_dictionary: HashMap<String, AccessControlEntry>,
}

/// Decode a subject descriptor and re-prefix it for the ACL endpoints.
pub fn identity_descriptor(descriptor: &SubjectDescriptor) -> Result<String, DescriptorError> {
    Ok(format!(
        "{}{}",
        IDENTITY_DESCRIPTOR_PREFIX,
        descriptor.decode_sid()?
    ))
}

/// The remote ACL store contract.
///
/// Implemented over HTTP by [`OrgApiClient`](crate::clients::OrgApiClient);
/// in-memory fakes implement it to verify the writer's merge contract.
/// Every operation returns an explicit result — a rejected write is an
/// error, never a log line.
#[async_trait]
pub trait AclStore: Send + Sync {
    /// Create or update one entry on a token's ACL.
    ///
    /// With `merge` set the store ORs `entry`'s bits into any existing
    /// entry for the same descriptor; otherwise the entry is replaced.
    async fn write_entry(
        &self,
        namespace_id: Uuid,
        token: &str,
        entry: &AccessControlEntry,
        merge: bool,
    ) -> Result<(), AclError>;

    /// Remove exactly one descriptor's entry from a token's ACL.
    async fn remove_entry(
        &self,
        namespace_id: Uuid,
        token: &str,
        identity_descriptor: &str,
    ) -> Result<(), AclError>;

    /// Remove the entire ACL for a token, optionally cascading to all
    /// descendant tokens sharing the prefix.
    async fn remove_acl(
        &self,
        namespace_id: Uuid,
        token: &str,
        recurse: bool,
    ) -> Result<(), AclError>;

    /// Read the ACL for a token, if one exists.
    async fn read_acl(
        &self,
        namespace_id: Uuid,
        token: &str,
    ) -> Result<Option<AccessControlList>, AclError>;

    /// Write a full ACL back to the store.
    async fn write_acl(&self, namespace_id: Uuid, acl: &AccessControlList) -> Result<(), AclError>;
}

/// Composes and writes Access Control Entries.
///
/// Owns the store and the immutable namespace catalog; the catalog is only
/// used to name namespaces in logs, so a failed display-name lookup fails
/// the write before anything is sent.
pub struct AceWriter<S> {
    store: S,
    catalog: Arc<NamespaceCatalog>,
    propagation: RetryConfig,
}

impl<S: AclStore> AceWriter<S> {
    /// Create a writer over a store and catalog.
    pub fn new(store: S, catalog: Arc<NamespaceCatalog>) -> Self {
        Self {
            store,
            catalog,
            propagation: RetryConfig::propagation(),
        }
    }

    /// Override the propagation-wait retry configuration.
    pub fn with_propagation(mut self, propagation: RetryConfig) -> Self {
        self.propagation = propagation;
        self
    }

    /// The namespace catalog this writer resolves display names against.
    pub fn catalog(&self) -> &Arc<NamespaceCatalog> {
        &self.catalog
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create or merge an entry for a descriptor on a token.
    ///
    /// `merge` asks the store to OR the new bits into any existing entry
    /// for the descriptor; without it the entry is replaced outright.
    #[instrument(skip(self, descriptor), fields(namespace = %namespace_id, token = %token))]
    pub async fn upsert_entry(
        &self,
        namespace_id: Uuid,
        token: &str,
        descriptor: &SubjectDescriptor,
        bits: AccessBits,
        merge: bool,
    ) -> Result<(), SecurityError> {
        let namespace_name = self.catalog.display_name(namespace_id)?;
        let entry = AccessControlEntry::for_subject(descriptor, bits)?;
        self.store
            .write_entry(namespace_id, token, &entry, merge)
            .await?;
        debug!(
            namespace = namespace_name,
            allow = bits.allow,
            deny = bits.deny,
            merge,
            "Set permission entry"
        );
        Ok(())
    }

    /// Remove one descriptor's entry from a token's ACL.
    #[instrument(skip(self, descriptor), fields(namespace = %namespace_id, token = %token))]
    pub async fn delete_entry(
        &self,
        namespace_id: Uuid,
        token: &str,
        descriptor: &SubjectDescriptor,
    ) -> Result<(), SecurityError> {
        let identity = identity_descriptor(descriptor)?;
        self.store
            .remove_entry(namespace_id, token, &identity)
            .await?;
        debug!(descriptor = %descriptor, "Deleted permission entry");
        Ok(())
    }

    /// Remove the entire ACL for a token.
    #[instrument(skip(self), fields(namespace = %namespace_id, token = %token))]
    pub async fn delete_acl(
        &self,
        namespace_id: Uuid,
        token: &str,
        recurse: bool,
    ) -> Result<(), SecurityError> {
        self.store.remove_acl(namespace_id, token, recurse).await?;
        debug!(recurse, "Deleted ACL");
        Ok(())
    }

    /// Flip a token's inherit-permissions flag off.
    ///
    /// Read-modify-write: polls the read with backoff until the store has
    /// an ACL for the token (writes propagate asynchronously), then writes
    /// the flag back. There is no optimistic-concurrency check — under
    /// concurrent callers on the same token, last write wins.
    #[instrument(skip(self), fields(namespace = %namespace_id, token = %token))]
    pub async fn disable_inheritance(
        &self,
        namespace_id: Uuid,
        token: &str,
    ) -> Result<(), SecurityError> {
        let mut acl = with_retry_if(
            &self.propagation,
            || async {
                self.store
                    .read_acl(namespace_id, token)
                    .await?
                    .ok_or_else(|| AclError::NotReady {
                        token: token.to_string(),
                    })
            },
            |e| matches!(e, AclError::NotReady { .. }),
        )
        .await?;

        acl.inherit_permissions = false;
        self.store.write_acl(namespace_id, &acl).await?;
        debug!("Disabled inherited permissions");
        Ok(())
    }
}
