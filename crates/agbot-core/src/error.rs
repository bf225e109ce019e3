//! # Error Types
//!
//! Leaf error types shared by every crate in the workspace. Higher layers
//! wrap these with `#[from]` rather than flattening them to strings, so the
//! original cause survives into log output.

use thiserror::Error;

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The value has no JSON form, e.g. a map with non-string keys.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Errors parsing a composite policy identifier.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdentifierError {
    /// The identifier has no `org/` qualifier.
    #[error("policy id \"{0}\" is not of the form <org>/<name>")]
    MissingOrg(String),

    /// One side of the `org/name` pair is empty.
    #[error("policy id \"{0}\" has an empty org or name")]
    EmptyComponent(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_error_display() {
        let cause = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CanonicalizationError::from(cause);
        assert!(format!("{err}").starts_with("serialization failed: "));
    }

    #[test]
    fn identifier_error_display() {
        let err = IdentifierError::MissingOrg("netspeed".to_string());
        assert!(format!("{err}").contains("netspeed"));
    }
}
