//! HTTP clients for the remote security and directory services.
//!
//! This module provides the reqwest-backed clients the engine runs against:
//! - `OrgApiClient`: the organization API — security namespaces, the group
//!   graph, user entitlements, and the ACL endpoints
//! - `ExternalGraphClient`: the external directory's graph API — group
//!   lookup and direct-membership checks
//!
//! Each client handles authentication and error mapping for its service.
//! The clients use shared configuration for service URLs and credentials.

pub mod config;
pub mod graph;
pub mod org;

pub use config::{ExternalGraphConfig, OrgEndpoints, PlatformConfig};
pub use graph::ExternalGraphClient;
pub use org::OrgApiClient;
