//! # Security Namespaces
//!
//! The namespace catalog: every securable resource category the platform
//! knows about, together with its named actions and their bit positions.
//! The catalog is fetched once per process and treated as immutable.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors from namespace and action resolution.
#[derive(Debug, Error)]
pub enum RightsError {
    /// No namespace with the given id exists in the catalog.
    #[error("Namespace '{0}' cannot be found")]
    NamespaceNotFound(Uuid),

    /// No namespace with the given dataspace category exists in the catalog.
    #[error("Namespace with category '{0}' cannot be found")]
    CategoryNotFound(String),

    /// The namespace exists but has no action with the given name.
    #[error("Action '{action}' cannot be found for namespace '{namespace_id}'")]
    ActionNotFound {
        /// Namespace that was searched.
        namespace_id: Uuid,
        /// Action name that was requested.
        action: String,
    },

    /// Two actions within one namespace claim the same bit position.
    #[error("Namespace '{namespace_id}' defines bit {bit} more than once")]
    DuplicateActionBit {
        /// Offending namespace.
        namespace_id: Uuid,
        /// Bit value that appears twice.
        bit: u32,
    },
}

/// A single named action within a security namespace.
///
/// Each action maps to exactly one bit position in the namespace's
/// allow/deny masks. Bits are platform-defined and are not assumed to be
/// low-order or contiguous.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAction {
    /// Stable action name used in templates and lookups.
    pub name: String,

    /// Human-readable action name.
    pub display_name: String,

    /// The bit this action occupies in the namespace masks.
    pub bit: u32,
}

/// A category of securable resource with its own action-to-bit mapping.
///
/// Mirrors the platform's security-namespace wire shape; the fields not
/// needed by the rights engine (token separators, structure values) are
/// intentionally absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityNamespace {
    /// Stable namespace identifier.
    pub namespace_id: Uuid,

    /// Namespace name.
    pub name: String,

    /// Human-readable namespace name, used in logging.
    pub display_name: String,

    /// Category key used for name-based lookup.
    pub dataspace_category: String,

    /// The namespace's actions, in platform order.
    pub actions: Vec<SecurityAction>,
}

/// Immutable catalog of all security namespaces for an organization.
///
/// Constructed once from the namespace list returned by the organization
/// API and shared for the process lifetime (typically behind an `Arc`).
/// Lookups are linear scans; catalogs are small and lookups are rare
/// relative to the remote calls they feed.
///
/// # Example
///
/// ```
/// use crewbase_rights::{NamespaceCatalog, SecurityAction, SecurityNamespace};
/// use uuid::Uuid;
///
/// let id = Uuid::new_v4();
/// let catalog = NamespaceCatalog::from_namespaces(vec![SecurityNamespace {
///     namespace_id: id,
///     name: "Build".to_string(),
///     display_name: "Build".to_string(),
///     dataspace_category: "Build".to_string(),
///     actions: vec![SecurityAction {
///         name: "ViewBuilds".to_string(),
///         display_name: "View builds".to_string(),
///         bit: 1,
///     }],
/// }]).unwrap();
///
/// assert_eq!(catalog.action(id, "ViewBuilds").unwrap().bit, 1);
/// assert_eq!(catalog.namespace_id("Build").unwrap(), id);
/// ```
#[derive(Debug, Clone)]
pub struct NamespaceCatalog {
    namespaces: Vec<SecurityNamespace>,
}

impl NamespaceCatalog {
    /// Build a catalog from a fetched namespace list.
    ///
    /// Validates that bit positions are unique within each namespace.
    ///
    /// # Errors
    ///
    /// Returns [`RightsError::DuplicateActionBit`] if a namespace defines
    /// the same bit twice.
    pub fn from_namespaces(namespaces: Vec<SecurityNamespace>) -> Result<Self, RightsError> {
        for namespace in &namespaces {
            let mut seen = std::collections::HashSet::new();
            for action in &namespace.actions {
                if !seen.insert(action.bit) {
                    return Err(RightsError::DuplicateActionBit {
                        namespace_id: namespace.namespace_id,
                        bit: action.bit,
                    });
                }
            }
        }
        Ok(Self { namespaces })
    }

    /// Look up an action by namespace id and action name.
    ///
    /// # Errors
    ///
    /// Returns [`RightsError::NamespaceNotFound`] or
    /// [`RightsError::ActionNotFound`] when either side of the lookup is
    /// absent. Both are hard failures: a missing name cannot be retried
    /// into existence.
    pub fn action(&self, namespace_id: Uuid, name: &str) -> Result<&SecurityAction, RightsError> {
        let namespace = self.namespace(namespace_id)?;
        namespace
            .actions
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| RightsError::ActionNotFound {
                namespace_id,
                action: name.to_string(),
            })
    }

    /// Look up a namespace id by its dataspace category key.
    pub fn namespace_id(&self, dataspace_category: &str) -> Result<Uuid, RightsError> {
        self.namespaces
            .iter()
            .find(|n| n.dataspace_category == dataspace_category)
            .map(|n| n.namespace_id)
            .ok_or_else(|| RightsError::CategoryNotFound(dataspace_category.to_string()))
    }

    /// Look up a namespace's display name by its id.
    pub fn display_name(&self, namespace_id: Uuid) -> Result<&str, RightsError> {
        Ok(self.namespace(namespace_id)?.display_name.as_str())
    }

    /// Number of namespaces in the catalog.
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    fn namespace(&self, namespace_id: Uuid) -> Result<&SecurityNamespace, RightsError> {
        self.namespaces
            .iter()
            .find(|n| n.namespace_id == namespace_id)
            .ok_or(RightsError::NamespaceNotFound(namespace_id))
    }
}
