//! Validation and conversion errors for policy payloads.

use thiserror::Error;

/// A policy definition failed semantic validation or could not be
/// converted or marshalled.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// The business policy does not name a service.
    #[error("business policy must name a service")]
    MissingServiceName,

    /// The referenced service has no owning org.
    #[error("service \"{service}\" must specify an org")]
    MissingServiceOrg {
        /// The service name.
        service: String,
    },

    /// The business policy lists no service versions.
    #[error("service \"{service}\" must list at least one service version")]
    NoServiceVersions {
        /// The service name.
        service: String,
    },

    /// A service version is not a dotted numeric version string.
    #[error("invalid service version \"{version}\" (expected 1 to 3 dot-separated integers)")]
    InvalidVersion {
        /// The offending version string.
        version: String,
    },

    /// The same service version is listed twice.
    #[error("service version \"{version}\" is listed more than once")]
    DuplicateVersion {
        /// The repeated version string.
        version: String,
    },

    /// A workload priority value of zero.
    #[error("priority for service version \"{version}\" must be greater than zero")]
    InvalidPriority {
        /// The version carrying the bad priority.
        version: String,
    },

    /// A property with an empty name.
    #[error("property name must be non-empty")]
    EmptyPropertyName,

    /// The same property name appears twice.
    #[error("property \"{name}\" is defined more than once")]
    DuplicateProperty {
        /// The repeated property name.
        name: String,
    },

    /// A constraint expression that is empty or all whitespace.
    #[error("constraint at index {index} is blank")]
    BlankConstraint {
        /// Position in the constraint list.
        index: usize,
    },

    /// Conversion was asked to produce a policy with no name.
    #[error("internal policy name must be non-empty")]
    MissingPolicyName,

    /// JSON marshalling of an internal policy failed.
    #[error("failed to marshal policy: {0}")]
    Marshal(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = PolicyError::InvalidVersion {
            version: "1.x".to_string(),
        };
        assert!(format!("{err}").contains("1.x"));

        let err = PolicyError::BlankConstraint { index: 2 };
        assert!(format!("{err}").contains("index 2"));
    }
}
