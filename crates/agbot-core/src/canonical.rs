//! # Canonical Serialization
//!
//! Policy definitions arrive as loosely ordered JSON. Hashing them directly
//! would make the digest depend on whatever key order the fleet registry
//! happened to emit, and every reorder would look like a content change.
//! [`CanonicalBytes`] is the one form a definition is hashed in.
//!
//! Encoding is RFC 8785 via `serde_jcs`: object keys sorted by UTF-16 code
//! units, no insignificant whitespace, and numbers in ECMAScript shortest
//! round-trip form. Values are otherwise taken as they are. In particular
//! strings are never rewritten, so two timestamps that denote the same
//! instant in different spellings are different content. Numbers compare
//! by value, so `1` and `1.0` encode alike.

use serde::Serialize;

use crate::error::CanonicalizationError;

/// RFC 8785 encoding of a definition. Only [`CanonicalBytes::new`] builds one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(String);

impl CanonicalBytes {
    /// Canonicalize `definition`.
    ///
    /// # Errors
    ///
    /// [`CanonicalizationError::SerializationFailed`] if the value has no
    /// JSON form, e.g. a map keyed by something other than strings.
    pub fn new(definition: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(definition)?;
        Ok(Self(serde_jcs::to_string(&value)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The encoding as text. RFC 8785 output is always UTF-8.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Display for CanonicalBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
