//! # Crewbase Security
//!
//! The remote-facing half of the Crewbase access-control engine: Access
//! Control Entry composition and writing, template-driven policy
//! application, and the HTTP clients for the organization API and the
//! external directory graph.
//!
//! ## Overview
//!
//! The crewbase-security crate handles:
//! - **ACLs**: ACE/ACL wire types, the [`AclStore`](acl::AclStore) store
//!   contract, and the [`AceWriter`](acl::AceWriter) with merge-vs-replace
//!   semantics
//! - **Policy**: the [`PolicyEngine`](apply::PolicyEngine) that turns
//!   declarative templates into descriptor resolution, bit computation,
//!   and entry writes
//! - **Clients**: reqwest clients for the organization API
//!   ([`OrgApiClient`](clients::OrgApiClient)) and the external directory
//!   graph ([`ExternalGraphClient`](clients::ExternalGraphClient))
//! - **Retry**: bounded exponential backoff for eventual-consistency waits
//!
//! ## Write semantics
//!
//! Every apply is a blind write: entries are never read back and diffed.
//! With `merge` set, the platform ORs new bits into any existing entry for
//! the same (namespace, token, descriptor); without it, the entry is
//! replaced outright. All write failures are explicit `Err` values — the
//! caller decides whether a failed permission write aborts the surrounding
//! apply or is logged and skipped.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use crewbase_rights::NamespaceCatalog;
//! use crewbase_security::acl::AceWriter;
//! use crewbase_security::clients::{OrgApiClient, PlatformConfig};
//!
//! async fn setup() {
//!     let config = PlatformConfig::from_env();
//!     let org = OrgApiClient::new(config.org.clone(), config.timeout());
//!
//!     // Fetch the namespace catalog once; it is immutable afterwards.
//!     let namespaces = org.security_namespaces().await.expect("catalog fetch");
//!     let catalog = Arc::new(NamespaceCatalog::from_namespaces(namespaces).expect("catalog"));
//!
//!     let writer = AceWriter::new(org, catalog);
//!     let _ = writer;
//! }
//! ```

pub mod acl;
pub mod apply;
pub mod clients;
pub mod retry;

// Re-export main types for convenience
pub use acl::{AccessControlEntry, AccessControlList, AceWriter, AclError, AclStore, SecurityError};
pub use apply::PolicyEngine;
pub use clients::{ExternalGraphClient, OrgApiClient, PlatformConfig};
pub use retry::{with_retry_if, RetryConfig};
