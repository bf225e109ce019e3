//! # Policy Identifiers
//!
//! The fleet registry names a business policy by a composite id of the form
//! `<org>/<name>`. The cache keys entries by the bare name within an org, so
//! most callers only need [`policy_name`]. [`PolicyId`] is the validated
//! form for callers that need both halves.

use crate::error::IdentifierError;

/// Policy name in a served triplet that matches every policy in the org.
pub const WILDCARD_POLICY: &str = "*";

/// Strip the org qualifier from a composite policy id.
///
/// `"e2edev/netspeed"` yields `"netspeed"`. An id with no `/` is returned
/// unchanged.
pub fn policy_name(id: &str) -> &str {
    match id.split_once('/') {
        Some((_, name)) => name,
        None => id,
    }
}

/// A validated `<org>/<name>` business policy identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyId {
    org: String,
    name: String,
}

impl PolicyId {
    /// Build an id from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::EmptyComponent`] if either part is empty.
    pub fn new(org: impl Into<String>, name: impl Into<String>) -> Result<Self, IdentifierError> {
        let org = org.into();
        let name = name.into();
        if org.is_empty() || name.is_empty() {
            return Err(IdentifierError::EmptyComponent(format!("{org}/{name}")));
        }
        Ok(Self { org, name })
    }

    /// Parse a composite `<org>/<name>` id.
    pub fn parse(id: &str) -> Result<Self, IdentifierError> {
        let (org, name) = id
            .split_once('/')
            .ok_or_else(|| IdentifierError::MissingOrg(id.to_string()))?;
        if org.is_empty() || name.is_empty() {
            return Err(IdentifierError::EmptyComponent(id.to_string()));
        }
        Ok(Self {
            org: org.to_string(),
            name: name.to_string(),
        })
    }

    /// The owning org.
    pub fn org(&self) -> &str {
        &self.org
    }

    /// The policy name within the org.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.org, self.name)
    }
}

impl std::str::FromStr for PolicyId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_name_strips_org() {
        assert_eq!(policy_name("e2edev/netspeed"), "netspeed");
    }

    #[test]
    fn policy_name_without_org_is_unchanged() {
        assert_eq!(policy_name("netspeed"), "netspeed");
    }

    #[test]
    fn policy_name_keeps_everything_after_first_slash() {
        assert_eq!(policy_name("org/a/b"), "a/b");
    }

    #[test]
    fn policy_id_parse_and_display() {
        let id: PolicyId = "userdev/bp_gpstest".parse().unwrap();
        assert_eq!(id.org(), "userdev");
        assert_eq!(id.name(), "bp_gpstest");
        assert_eq!(id.to_string(), "userdev/bp_gpstest");
    }

    #[test]
    fn policy_id_rejects_bad_forms() {
        assert_eq!(
            PolicyId::parse("bp_gpstest"),
            Err(IdentifierError::MissingOrg("bp_gpstest".to_string()))
        );
        assert!(matches!(
            PolicyId::parse("/bp_gpstest"),
            Err(IdentifierError::EmptyComponent(_))
        ));
        assert!(PolicyId::new("userdev", "").is_err());
    }
}
