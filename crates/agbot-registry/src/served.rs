//! # Served-Policy Table
//!
//! The routing table of `(policy org, policy name or "*", node org)`
//! triplets this agent is currently responsible for, keyed by the fleet
//! registry's triplet id. The table is always replaced wholesale; it is
//! never merged.

use std::collections::{BTreeMap, BTreeSet};

use agbot_core::WILDCARD_POLICY;
use serde::{Deserialize, Serialize};

/// One served triplet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServedBusinessPolicy {
    /// Org owning the business policy.
    pub business_pol_org: String,
    /// Policy name, or `*` for every policy in the org.
    pub business_pol: String,
    /// Org of the nodes to negotiate with. Empty means the policy org.
    #[serde(default)]
    pub node_org: String,
}

impl ServedBusinessPolicy {
    /// Build a triplet.
    pub fn new(
        business_pol_org: impl Into<String>,
        business_pol: impl Into<String>,
        node_org: impl Into<String>,
    ) -> Self {
        Self {
            business_pol_org: business_pol_org.into(),
            business_pol: business_pol.into(),
            node_org: node_org.into(),
        }
    }

    /// True if this triplet covers policy `name` in `org`.
    pub fn matches(&self, org: &str, name: &str) -> bool {
        self.business_pol_org == org
            && (self.business_pol == name || self.business_pol == WILDCARD_POLICY)
    }

    /// The node org, defaulting to the policy org when unset.
    pub fn resolved_node_org(&self) -> &str {
        if self.node_org.is_empty() {
            &self.business_pol_org
        } else {
            &self.node_org
        }
    }
}

impl std::fmt::Display for ServedBusinessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} -> {}",
            self.business_pol_org,
            self.business_pol,
            self.resolved_node_org()
        )
    }
}

/// Served triplets keyed by triplet id.
pub type ServedPolicyMap = BTreeMap<String, ServedBusinessPolicy>;

/// Query wrapper over the current served-triplet set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServedPolicyTable {
    entries: ServedPolicyMap,
}

impl ServedPolicyTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole table, returning the previous contents.
    pub fn replace(&mut self, entries: ServedPolicyMap) -> ServedPolicyMap {
        std::mem::replace(&mut self.entries, entries)
    }

    /// Number of triplets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no triplet is served.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(triplet id, triplet)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ServedBusinessPolicy)> {
        self.entries.iter()
    }

    /// True if any triplet matches `(org, name)` or `(org, "*")`.
    pub fn serves_policy(&self, org: &str, name: &str) -> bool {
        self.entries.values().any(|sp| sp.matches(org, name))
    }

    /// True if any triplet's policy org is `org`.
    pub fn serves_org(&self, org: &str) -> bool {
        self.entries.values().any(|sp| sp.business_pol_org == org)
    }

    /// Node orgs of every triplet matching `(org, name)`, in triplet id
    /// order. Duplicates are kept.
    pub fn node_orgs_for(&self, org: &str, name: &str) -> Vec<String> {
        self.entries
            .values()
            .filter(|sp| sp.matches(org, name))
            .map(|sp| sp.resolved_node_org().to_string())
            .collect()
    }

    /// The distinct policy orgs named by the table.
    pub fn policy_orgs(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .map(|sp| sp.business_pol_org.clone())
            .collect()
    }
}

impl From<ServedPolicyMap> for ServedPolicyTable {
    fn from(entries: ServedPolicyMap) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ServedPolicyTable {
        let mut map = ServedPolicyMap::new();
        map.insert(
            "e2edev_bp_netspeed_e2edev".to_string(),
            ServedBusinessPolicy::new("e2edev", "bp_netspeed", "e2edev"),
        );
        map.insert(
            "userdev_*_userdev".to_string(),
            ServedBusinessPolicy::new("userdev", "*", ""),
        );
        map.insert(
            "userdev_*_e2edev".to_string(),
            ServedBusinessPolicy::new("userdev", "*", "e2edev"),
        );
        ServedPolicyTable::from(map)
    }

    #[test]
    fn exact_name_match() {
        let t = table();
        assert!(t.serves_policy("e2edev", "bp_netspeed"));
        assert!(!t.serves_policy("e2edev", "bp_gpstest"));
    }

    #[test]
    fn wildcard_matches_any_name() {
        let t = table();
        assert!(t.serves_policy("userdev", "bp_gpstest"));
        assert!(t.serves_policy("userdev", "anything"));
        assert!(!t.serves_policy("otherorg", "anything"));
    }

    #[test]
    fn serves_org_checks_policy_org_only() {
        let t = table();
        assert!(t.serves_org("userdev"));
        assert!(t.serves_org("e2edev"));
        // e2edev appears as a node org for userdev, but that is not a policy org match.
        assert!(!t.serves_org("nodeonly"));
    }

    #[test]
    fn node_orgs_default_to_policy_org() {
        let t = table();
        assert_eq!(t.node_orgs_for("userdev", "bp_gpstest"), vec!["e2edev", "userdev"]);
        assert_eq!(t.node_orgs_for("e2edev", "bp_netspeed"), vec!["e2edev"]);
        assert!(t.node_orgs_for("e2edev", "bp_other").is_empty());
    }

    #[test]
    fn replace_returns_previous() {
        let mut t = table();
        let old = t.replace(ServedPolicyMap::new());
        assert_eq!(old.len(), 3);
        assert!(t.is_empty());
        assert!(t.policy_orgs().is_empty());
    }

    #[test]
    fn policy_orgs_are_distinct() {
        let orgs: Vec<String> = table().policy_orgs().into_iter().collect();
        assert_eq!(orgs, vec!["e2edev", "userdev"]);
    }

    #[test]
    fn triplet_wire_format() {
        let sp: ServedBusinessPolicy = serde_json::from_str(
            r#"{"businessPolOrg":"userdev","businessPol":"*","nodeOrg":""}"#,
        )
        .unwrap();
        assert_eq!(sp.resolved_node_org(), "userdev");
        assert_eq!(sp.to_string(), "userdev/* -> userdev");
    }
}
