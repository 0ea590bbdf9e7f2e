//! # Permission Bits
//!
//! Translation from declarative action names to the platform's allow/deny
//! bitmask encoding. The wire protocol carries masks; templates carry
//! names; [`compute_bits`] bridges the two through the namespace catalog.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::namespace::{NamespaceCatalog, RightsError};

/// A pair of allow and deny bitmasks for one namespace.
///
/// Masks are 32-bit unsigned values, matching the platform's ACE encoding.
/// Action bits are platform-defined and may be anywhere in the word.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessBits {
    /// Bits the principal is allowed.
    pub allow: u32,

    /// Bits the principal is denied.
    pub deny: u32,
}

impl AccessBits {
    /// Create a bit pair from raw masks.
    pub fn new(allow: u32, deny: u32) -> Self {
        Self { allow, deny }
    }

    /// Bitwise-OR both masks with another pair.
    ///
    /// This is the same combination the platform applies server-side when
    /// an entry is written with the merge flag set.
    pub fn union(self, other: AccessBits) -> Self {
        Self {
            allow: self.allow | other.allow,
            deny: self.deny | other.deny,
        }
    }

    /// Check whether neither mask has any bit set.
    pub fn is_empty(&self) -> bool {
        self.allow == 0 && self.deny == 0
    }
}

/// Compute allow and deny masks for a namespace from action names.
///
/// Each name in `allow` contributes its bit to the allow mask, each name in
/// `deny` to the deny mask. Empty slices contribute nothing. Valid templates
/// keep the two sides disjoint; overlapping names produce overlapping masks
/// and are left to the platform's deny-wins evaluation.
///
/// # Errors
///
/// Fails fast with [`RightsError`] if the namespace or any action name is
/// unknown — every downstream ACL write depends on these bits, so a partial
/// mask is never returned.
///
/// # Example
///
/// ```
/// use crewbase_rights::{compute_bits, NamespaceCatalog, SecurityAction, SecurityNamespace};
/// use uuid::Uuid;
///
/// let id = Uuid::new_v4();
/// let catalog = NamespaceCatalog::from_namespaces(vec![SecurityNamespace {
///     namespace_id: id,
///     name: "Git".to_string(),
///     display_name: "Git".to_string(),
///     dataspace_category: "Git".to_string(),
///     actions: vec![
///         SecurityAction { name: "Read".into(), display_name: "Read".into(), bit: 1 },
///         SecurityAction { name: "Write".into(), display_name: "Write".into(), bit: 2 },
///     ],
/// }]).unwrap();
///
/// let bits = compute_bits(&catalog, id, &["Read".into(), "Write".into()], &[]).unwrap();
/// assert_eq!(bits.allow, 3);
/// assert_eq!(bits.deny, 0);
/// ```
pub fn compute_bits(
    catalog: &NamespaceCatalog,
    namespace_id: Uuid,
    allow: &[String],
    deny: &[String],
) -> Result<AccessBits, RightsError> {
    let mut bits = AccessBits::default();
    for action in allow {
        bits.allow |= catalog.action(namespace_id, action)?.bit;
    }
    for action in deny {
        bits.deny |= catalog.action(namespace_id, action)?.bit;
    }
    Ok(bits)
}
