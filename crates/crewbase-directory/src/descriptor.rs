//! # Subject Descriptors
//!
//! Every principal the platform knows about — user, native group, external
//! group — is addressed by a descriptor: an origin-system tag, a `.`
//! separator, and a base64 payload that decodes to the underlying security
//! identifier. The tag is the discriminator the membership resolver uses to
//! decide which backend to query next.

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurposeConfig;
use base64::engine::{DecodePaddingMode, GeneralPurpose};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Origin tag for groups in the platform's native directory.
pub const NATIVE_GROUP_TAG: &str = "vssgp";

/// Origin tag for groups backed by the external directory.
pub const EXTERNAL_GROUP_TAG: &str = "aadgp";

// Descriptor payloads come unpadded on the wire; accept either form.
const PAYLOAD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors from descriptor decoding.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The descriptor has no `.` separator, so no origin tag or payload.
    #[error("Descriptor '{0}' has no origin separator")]
    MissingSeparator(String),

    /// The payload after the separator is not valid base64.
    #[error("Descriptor payload is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    /// The decoded payload is not valid UTF-8.
    #[error("Descriptor payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// An opaque, prefixed principal identifier within one directory system.
///
/// Descriptors are compared and stored as-is; [`decode_sid`] recovers the
/// security identifier when the platform's ACL endpoints need it.
///
/// [`decode_sid`]: SubjectDescriptor::decode_sid
///
/// # Example
///
/// ```
/// use crewbase_directory::SubjectDescriptor;
///
/// // "S-1-9-1551374245-1204400969-2402986413-2179408616-0-0-0-0-1" base64-encoded
/// let descriptor = SubjectDescriptor::new(
///     "vssgp.Uy0xLTktMTU1MTM3NDI0NS0xMjA0NDAwOTY5LTI0MDI5ODY0MTMtMjE3OTQwODYxNi0wLTAtMC0wLTE",
/// );
/// assert_eq!(descriptor.origin_tag(), Some("vssgp"));
/// assert!(descriptor.decode_sid().unwrap().starts_with("S-1-9-"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SubjectDescriptor(String);

impl SubjectDescriptor {
    /// Wrap a raw descriptor string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw descriptor string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The origin-system tag: the characters before the first `.`.
    ///
    /// Returns `None` when the descriptor has no separator.
    pub fn origin_tag(&self) -> Option<&str> {
        self.0.split_once('.').map(|(tag, _)| tag)
    }

    /// Check whether this descriptor names a native platform group.
    pub fn is_native_group(&self) -> bool {
        self.origin_tag() == Some(NATIVE_GROUP_TAG)
    }

    /// Check whether this descriptor names an external-directory group.
    pub fn is_external_group(&self) -> bool {
        self.origin_tag() == Some(EXTERNAL_GROUP_TAG)
    }

    /// Decode the descriptor to its underlying security identifier.
    ///
    /// Strips the routing prefix up to and including the first `.` and
    /// base64-decodes the remainder. Pure and stateless.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] for descriptors without a separator,
    /// with a non-base64 payload, or with a payload that is not UTF-8 —
    /// malformed input never yields a garbage identifier.
    pub fn decode_sid(&self) -> Result<String, DescriptorError> {
        let (_, payload) = self
            .0
            .split_once('.')
            .ok_or_else(|| DescriptorError::MissingSeparator(self.0.clone()))?;
        let decoded = PAYLOAD.decode(payload)?;
        Ok(String::from_utf8(decoded)?)
    }
}

impl std::fmt::Display for SubjectDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectDescriptor {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
