//! # agbot-core: Foundational Types for the Agreement Bot Policy Cache
//!
//! This crate is the leaf of the workspace. It defines the primitives every
//! other crate builds on: the canonical byte form used for change detection,
//! the content digest computed over it, policy identifier helpers and the
//! UTC timestamp stamped on cached entries.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** ALL content hashing flows through
//!    `CanonicalBytes::new()`. Two definitions that differ only in key order
//!    or whitespace produce the same bytes, so they never look "changed".
//!
//! 2. **`sha256_digest()` accepts only `&CanonicalBytes`.** Compile-time
//!    enforcement that no digest is computed over non-canonical bytes.
//!
//! 3. **UTC-only timestamps.** `Timestamp` stores UTC and renders it with
//!    second precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `agbot-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{hash_policy, sha256_digest, ContentDigest, DigestParseError};
pub use error::{CanonicalizationError, IdentifierError};
pub use identity::{policy_name, PolicyId, WILDCARD_POLICY};
pub use temporal::Timestamp;
