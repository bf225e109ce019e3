//! # Content Digest
//!
//! The policy cache decides whether a definition fetched from the fleet
//! registry differs from the cached one by comparing [`ContentDigest`]s.
//! A digest is only ever computed over [`CanonicalBytes`], so two
//! definitions that differ in key order or whitespace compare equal and a
//! refresh cycle does not trigger spurious renegotiation.

use std::str::FromStr;

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::CanonicalizationError;

const PREFIX: &str = "sha256:";

/// SHA-256 over the canonical form of a policy definition.
///
/// Renders and serializes as `sha256:<64 hex chars>`, and parses back from
/// that form or from bare hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex without the algorithm prefix.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{PREFIX}{}", self.to_hex())
    }
}

impl std::fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentDigest({self})")
    }
}

/// Parse error for a textual digest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid content digest \"{0}\": expected sha256:<64 hex chars>")]
pub struct DigestParseError(String);

impl FromStr for ContentDigest {
    type Err = DigestParseError;

    /// Accepts `sha256:<hex>` or bare hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix(PREFIX).unwrap_or(s);
        let invalid = || DigestParseError(s.to_string());
        if hex.len() != 64 || !hex.is_ascii() {
            return Err(invalid());
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Digest canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&Sha256::digest(data.as_bytes()));
    ContentDigest(bytes)
}

/// Hash a policy definition as fetched from the fleet registry.
///
/// Any change to the canonicalization rules changes every digest, and the
/// first refresh after such an upgrade reports every served policy as
/// changed.
///
/// # Errors
///
/// The canonicalization error, unchanged. Callers treat it as a
/// serialization failure that aborts the surrounding mutation.
pub fn hash_policy(definition: &impl Serialize) -> Result<ContentDigest, CanonicalizationError> {
    Ok(sha256_digest(&CanonicalBytes::new(definition)?))
}
