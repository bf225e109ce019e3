//! # Registry Errors
//!
//! Every mutation returns its error synchronously to the refresh loop that
//! called it. Nothing here is retried internally; the next refresh cycle is
//! the retry.

use agbot_core::CanonicalizationError;
use agbot_policy::PolicyError;
use thiserror::Error;

/// Failure building or updating a single policy entry.
#[derive(Error, Debug)]
pub enum EntryError {
    /// The definition could not be canonicalized for hashing.
    #[error("unable to hash policy: {0}")]
    Hash(#[from] CanonicalizationError),

    /// The definition failed validation or conversion.
    #[error("invalid policy: {0}")]
    Invalid(#[from] PolicyError),
}

/// Errors returned by [`PolicyManager`](crate::PolicyManager) operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The org is not tracked by this agent.
    #[error("org {org} not found in policy manager")]
    OrgNotFound {
        /// The requested org.
        org: String,
    },

    /// No business policy of that name is cached under the org.
    #[error("business policy {policy} not found in org {org}")]
    PolicyNotFound {
        /// The org searched.
        org: String,
        /// The policy name.
        policy: String,
    },

    /// Hashing a fetched definition failed. Aborts the call.
    #[error("unable to hash business policy {policy} for org {org}: {source}")]
    Hash {
        /// The org being updated.
        org: String,
        /// Composite id of the definition.
        policy: String,
        /// Underlying canonicalization failure.
        #[source]
        source: CanonicalizationError,
    },

    /// Creating or updating an entry failed. Aborts the call.
    #[error("unable to store business policy {policy} for org {org}: {source}")]
    Entry {
        /// The org being updated.
        org: String,
        /// Composite id of the definition.
        policy: String,
        /// Underlying entry failure.
        #[source]
        source: EntryError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = RegistryError::OrgNotFound {
            org: "userdev".to_string(),
        };
        assert_eq!(err.to_string(), "org userdev not found in policy manager");
    }

    #[test]
    fn entry_error_keeps_source() {
        let err = RegistryError::Entry {
            org: "e2edev".to_string(),
            policy: "e2edev/bp_netspeed".to_string(),
            source: EntryError::Invalid(PolicyError::MissingServiceName),
        };
        let source = std::error::Error::source(&err).expect("source");
        assert!(source.to_string().contains("must name a service"));
    }
}
