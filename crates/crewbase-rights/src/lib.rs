//! # Crewbase Rights
//!
//! This crate provides the security-namespace rights model for the Crewbase
//! platform, shared by the provisioning tooling and the ACL engine.
//!
//! ## Overview
//!
//! The crewbase-rights crate handles:
//! - **Namespaces**: The catalog of securable resource categories and their
//!   named actions
//! - **Bits**: Translation from action names to the platform's allow/deny
//!   bitmask encoding
//! - **Templates**: Declarative permission templates consumed by the policy
//!   application layer
//!
//! ## Architecture
//!
//! ```text
//! Namespace = resource category + ordered actions (name -> bit)
//!
//! Examples:
//!   "GitRepositories" / "Read"       -> bit 1
//!   "GitRepositories" / "Contribute" -> bit 4
//!   "Build" / "QueueBuilds"          -> bit 128
//! ```
//!
//! Permissions are expressed declaratively by action *name* in templates,
//! while the wire protocol requires bitmasks. The catalog provides the
//! indirection, so templates stay stable across namespace versions as long
//! as action names do not change.
//!
//! ## Usage
//!
//! ```rust
//! use crewbase_rights::{compute_bits, NamespaceCatalog, SecurityAction, SecurityNamespace};
//! use uuid::Uuid;
//!
//! let git = Uuid::new_v4();
//! let catalog = NamespaceCatalog::from_namespaces(vec![SecurityNamespace {
//!     namespace_id: git,
//!     name: "Git Repositories".to_string(),
//!     display_name: "Git Repositories".to_string(),
//!     dataspace_category: "Git".to_string(),
//!     actions: vec![
//!         SecurityAction { name: "Read".into(), display_name: "Read".into(), bit: 1 },
//!         SecurityAction { name: "Write".into(), display_name: "Write".into(), bit: 2 },
//!     ],
//! }]).unwrap();
//!
//! let bits = compute_bits(&catalog, git, &["Read".into(), "Write".into()], &[]).unwrap();
//! assert_eq!(bits.allow, 3);
//! assert_eq!(bits.deny, 0);
//! ```
//!
//! The catalog is an immutable value object: fetch the namespace list once,
//! construct the catalog, and share it (typically behind an `Arc`) for the
//! process lifetime.

pub mod bits;
pub mod namespace;
pub mod template;

// Re-export main types for convenience
pub use bits::{compute_bits, AccessBits};
pub use namespace::{NamespaceCatalog, RightsError, SecurityAction, SecurityNamespace};
pub use template::{
    GroupScope, NamespaceGrant, ObjectPermission, ProjectPermission, ResourceRights, SimpleRights,
};
