//! # Policy Entries
//!
//! Cached, versioned records of policies fetched from the fleet registry.
//! Each entry keeps the converted internal policy, when it was last written
//! and the content hash of the definition it was built from. A business
//! policy entry also owns the service policies of the services it deploys.
//!
//! ## Invariant
//!
//! The hash always describes the definition the stored policy was converted
//! from. An update validates and converts first and only then swaps the
//! policy, hash and timestamp together, so a rejected definition leaves the
//! entry exactly as it was.

use std::collections::BTreeMap;

use agbot_core::{hash_policy, ContentDigest, Timestamp};
use agbot_policy::{BusinessPolicy, ExternalPolicy, Policy};
use serde::Serialize;

use crate::error::EntryError;

/// A cached service policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePolicyEntry {
    policy: Policy,
    updated: Timestamp,
    hash: ContentDigest,
}

impl ServicePolicyEntry {
    /// Hash, validate and convert a service policy for `service_id`.
    pub fn new(definition: &ExternalPolicy, service_id: &str) -> Result<Self, EntryError> {
        let hash = hash_policy(definition)?;
        let policy = definition.to_policy(service_id)?;
        Ok(Self {
            policy,
            updated: Timestamp::now(),
            hash,
        })
    }

    /// The converted policy.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// When this entry was written.
    pub fn updated(&self) -> Timestamp {
        self.updated
    }

    /// Content hash of the source definition.
    pub fn hash(&self) -> &ContentDigest {
        &self.hash
    }
}

impl std::fmt::Display for ServicePolicyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ServicePolicyEntry: Updated: {} Hash: {} Policy: {}",
            self.updated,
            self.hash.to_hex(),
            self.policy
        )
    }
}

/// A cached business policy and the service policies attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessPolicyEntry {
    policy: Policy,
    updated: Timestamp,
    hash: ContentDigest,
    service_policies: BTreeMap<String, ServicePolicyEntry>,
}

impl BusinessPolicyEntry {
    /// Hash, validate and convert a business policy served as `policy_id`.
    pub fn new(definition: &BusinessPolicy, policy_id: &str) -> Result<Self, EntryError> {
        let hash = hash_policy(definition)?;
        let policy = definition.to_policy(policy_id)?;
        Ok(Self {
            policy,
            updated: Timestamp::now(),
            hash,
            service_policies: BTreeMap::new(),
        })
    }

    /// Replace the entry's content with a changed definition.
    ///
    /// `new_hash` is the already computed hash of `definition`. Clears every
    /// attached service policy and returns the new internal policy for the
    /// change event.
    pub fn update_entry(
        &mut self,
        definition: &BusinessPolicy,
        policy_id: &str,
        new_hash: ContentDigest,
    ) -> Result<&Policy, EntryError> {
        let policy = definition.to_policy(policy_id)?;
        self.policy = policy;
        self.hash = new_hash;
        self.updated = Timestamp::now();
        self.service_policies.clear();
        Ok(&self.policy)
    }

    /// Attach a service policy for `service_id`, replacing any previous one.
    ///
    /// Does nothing when there is no policy or no service id.
    pub fn add_service_policy(
        &mut self,
        definition: Option<&ExternalPolicy>,
        service_id: &str,
    ) -> Result<(), EntryError> {
        let Some(definition) = definition else {
            return Ok(());
        };
        if service_id.is_empty() {
            return Ok(());
        }
        let entry = ServicePolicyEntry::new(definition, service_id)?;
        self.service_policies.insert(service_id.to_string(), entry);
        Ok(())
    }

    /// Drop every attached service policy.
    pub fn clear_service_policies(&mut self) {
        self.service_policies.clear();
    }

    /// The converted business policy.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// When the content was last written.
    pub fn updated(&self) -> Timestamp {
        self.updated
    }

    /// Content hash of the source definition.
    pub fn hash(&self) -> &ContentDigest {
        &self.hash
    }

    /// The service policy attached for `service_id`.
    pub fn service_policy(&self, service_id: &str) -> Option<&ServicePolicyEntry> {
        self.service_policies.get(service_id)
    }

    /// All attached service policies keyed by service id.
    pub fn service_policies(&self) -> &BTreeMap<String, ServicePolicyEntry> {
        &self.service_policies
    }

    /// One-line summary for logs: policy name and service ids only.
    pub fn short_summary(&self) -> String {
        let ids: Vec<&str> = self.service_policies.keys().map(String::as_str).collect();
        format!(
            "BusinessPolicyEntry: Updated: {} Hash: {} Policy: {} ServicePolicies: {:?}",
            self.updated,
            self.hash.to_hex(),
            self.policy.name(),
            ids
        )
    }
}

impl std::fmt::Display for BusinessPolicyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BusinessPolicyEntry: Updated: {} Hash: {} Policy: {} ServicePolicies: [",
            self.updated,
            self.hash.to_hex(),
            self.policy
        )?;
        for (i, (id, sp)) in self.service_policies.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}: {sp}")?;
        }
        f.write_str("]")
    }
}
