//! # Policy Manager
//!
//! The policy cache shared by the refresh loop and the negotiation workers.
//!
//! ## Data
//!
//! - The served-policy table: the triplets this agent is responsible for.
//! - The org map: org → policy name → [`BusinessPolicyEntry`] for every
//!   served policy that also has a definition in the fleet registry.
//!
//! ## Concurrency
//!
//! Each structure has its own `parking_lot::Mutex`. The refresh loop drives
//! [`replace_served_policies`](PolicyManager::replace_served_policies) and
//! [`update_org_policies`](PolicyManager::update_org_policies); any number
//! of workers call the read-only queries concurrently. Whenever both locks
//! are needed the org lock is taken first. Queries on the served table take
//! only the served lock, so the reverse order never occurs.
//!
//! Queries return copies; no reference into either map escapes its lock.
//!
//! ## Events
//!
//! A content change of a cached policy publishes one
//! [`PolicyEvent::Changed`]; every removed policy publishes one
//! [`PolicyEvent::Deleted`]. Creation publishes nothing. Events are
//! published with the org lock held.

use std::collections::BTreeMap;
use std::sync::Arc;

use agbot_core::{hash_policy, policy_name};
use agbot_policy::{ExchangeBusinessPolicy, ExternalPolicy};
use parking_lot::Mutex;

use crate::config::RegistryConfig;
use crate::entry::BusinessPolicyEntry;
use crate::error::RegistryError;
use crate::events::{event_channel, EventSink, PolicyEvent};
use crate::served::{ServedPolicyMap, ServedPolicyTable};

/// Cached business policies of one org, keyed by policy name.
pub type OrgPolicies = BTreeMap<String, BusinessPolicyEntry>;

type OrgPolicyMap = BTreeMap<String, OrgPolicies>;

/// Business policy definitions of one org keyed by composite `<org>/<name>` id.
pub type PolicyDefinitions = BTreeMap<String, ExchangeBusinessPolicy>;

/// The policy cache and change detector.
pub struct PolicyManager {
    // Lock order: org_policies before served.
    org_policies: Mutex<OrgPolicyMap>,
    served: Mutex<ServedPolicyTable>,
    events: Arc<dyn EventSink>,
}

impl PolicyManager {
    /// Create an empty manager publishing to `events`.
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self {
            org_policies: Mutex::new(OrgPolicyMap::new()),
            served: Mutex::new(ServedPolicyTable::new()),
            events,
        }
    }

    /// Create an empty manager together with the receiving end of the event
    /// channel described by `config`.
    pub fn with_config(config: &RegistryConfig) -> (Self, std::sync::mpsc::Receiver<PolicyEvent>) {
        let (sink, rx) = event_channel(config);
        (Self::new(sink), rx)
    }

    // -- Mutations -----------------------------------------------------------

    /// Replace the served-triplet set with `served`, the complete current set.
    ///
    /// Orgs appearing for the first time get an empty policy map. Orgs no
    /// longer named by any triplet are deleted together with their policies,
    /// publishing one delete event per cached policy.
    pub fn replace_served_policies(&self, served: ServedPolicyMap) -> Result<(), RegistryError> {
        let mut orgs = self.org_policies.lock();

        let unserved: Vec<String> = {
            let mut table = self.served.lock();
            if table.is_empty() && served.is_empty() {
                return Ok(());
            }
            table.replace(served);

            for org in table.policy_orgs() {
                if !orgs.contains_key(&org) {
                    tracing::debug!(org = %org, "tracking new org");
                    orgs.insert(org, OrgPolicies::new());
                }
            }

            orgs.keys()
                .filter(|org| !table.serves_org(org))
                .cloned()
                .collect()
        };

        for org in unserved {
            tracing::debug!(org = %org, "deleting org, it is no longer served by this agent");
            self.delete_org(&mut orgs, &org);
        }
        Ok(())
    }

    /// Reconcile the cached policies of `org` against `definitions`, the
    /// complete set of business policies currently defined in that org.
    ///
    /// Cached policies that are no longer served or defined are deleted
    /// first. Then every served definition is either cached (new), ignored
    /// (hash unchanged) or replaced with a change event (hash changed).
    ///
    /// # Errors
    ///
    /// [`RegistryError::OrgNotFound`] if `org` is not tracked; nothing is
    /// changed. A hashing or validation failure aborts the call; changes
    /// already applied earlier in the same call are kept.
    pub fn update_org_policies(
        &self,
        org: &str,
        definitions: &PolicyDefinitions,
    ) -> Result<(), RegistryError> {
        let mut orgs = self.org_policies.lock();

        if !orgs.contains_key(org) {
            return Err(RegistryError::OrgNotFound {
                org: org.to_string(),
            });
        }

        if definitions.is_empty() {
            tracing::debug!(org = %org, "deleting org, it has no business policies");
            self.delete_org(&mut orgs, org);
            return Ok(());
        }

        let cached: Vec<String> = orgs
            .get(org)
            .map(|policies| policies.keys().cloned().collect())
            .unwrap_or_default();
        for name in cached {
            let still_defined = definitions.keys().any(|id| policy_name(id) == name);
            if !(still_defined && self.is_policy_served(org, &name)) {
                tracing::debug!(org = %org, policy = %name, "deleting business policy, it no longer exists or is not served");
                self.delete_business_policy(&mut orgs, org, &name);
            }
        }

        for (id, record) in definitions {
            let name = policy_name(id);
            if !self.is_policy_served(org, name) {
                continue;
            }
            let definition = record.business_policy();
            let Some(policies) = orgs.get_mut(org) else {
                return Err(RegistryError::OrgNotFound {
                    org: org.to_string(),
                });
            };

            match policies.get_mut(name) {
                Some(entry) => {
                    let new_hash = hash_policy(definition).map_err(|source| RegistryError::Hash {
                        org: org.to_string(),
                        policy: id.clone(),
                        source,
                    })?;
                    if entry.hash() == &new_hash {
                        continue;
                    }

                    tracing::debug!(org = %org, policy = %id, "updating policy entry, content changed");
                    let policy = entry.update_entry(definition, id, new_hash).map_err(|source| {
                        RegistryError::Entry {
                            org: org.to_string(),
                            policy: id.clone(),
                            source,
                        }
                    })?;

                    tracing::info!(org = %org, policy = %id, "detected changed business policy");
                    match policy.marshal() {
                        Ok(serialized) => {
                            let event = PolicyEvent::changed(policy.name(), org, serialized);
                            self.publish(event);
                        }
                        Err(e) => {
                            tracing::error!(org = %org, policy = %id, error = %e, "unable to marshal changed policy, no event published");
                        }
                    }
                }
                None => {
                    let entry = BusinessPolicyEntry::new(definition, id).map_err(|source| {
                        RegistryError::Entry {
                            org: org.to_string(),
                            policy: id.clone(),
                            source,
                        }
                    })?;
                    tracing::debug!(org = %org, policy = %id, "caching new business policy");
                    policies.insert(name.to_string(), entry);
                }
            }
        }

        Ok(())
    }

    /// Attach a service policy to the cached business policy `name` in `org`.
    ///
    /// Publishes nothing. Attached service policies are dropped whenever the
    /// business policy's content changes.
    pub fn add_service_policy(
        &self,
        org: &str,
        name: &str,
        definition: &ExternalPolicy,
        service_id: &str,
    ) -> Result<(), RegistryError> {
        let mut orgs = self.org_policies.lock();
        let entry = orgs
            .get_mut(org)
            .and_then(|policies| policies.get_mut(name))
            .ok_or_else(|| RegistryError::PolicyNotFound {
                org: org.to_string(),
                policy: name.to_string(),
            })?;
        entry
            .add_service_policy(Some(definition), service_id)
            .map_err(|source| RegistryError::Entry {
                org: org.to_string(),
                policy: name.to_string(),
                source,
            })
    }

    // -- Org-map queries -----------------------------------------------------

    /// True if `org` has a policy map.
    pub fn is_org_tracked(&self, org: &str) -> bool {
        self.org_policies.lock().contains_key(org)
    }

    /// True if business policy `name` is cached under `org`.
    pub fn has_policy(&self, org: &str, name: &str) -> bool {
        self.org_policies
            .lock()
            .get(org)
            .is_some_and(|policies| policies.contains_key(name))
    }

    /// A copy of the cached entry for `name` in `org`.
    pub fn policy_entry(&self, org: &str, name: &str) -> Option<BusinessPolicyEntry> {
        self.org_policies
            .lock()
            .get(org)
            .and_then(|policies| policies.get(name))
            .cloned()
    }

    /// A copy of every cached entry of `org`; empty if the org is untracked.
    pub fn all_policies_for_org(&self, org: &str) -> OrgPolicies {
        self.org_policies
            .lock()
            .get(org)
            .cloned()
            .unwrap_or_default()
    }

    /// Every tracked org, sorted.
    pub fn all_tracked_orgs(&self) -> Vec<String> {
        self.org_policies.lock().keys().cloned().collect()
    }

    // -- Served-table queries ------------------------------------------------

    /// True if a served triplet covers `(org, name)`, directly or by wildcard.
    pub fn is_policy_served(&self, org: &str, name: &str) -> bool {
        self.served.lock().serves_policy(org, name)
    }

    /// True if any served triplet names `org` as its policy org.
    pub fn is_org_served(&self, org: &str) -> bool {
        self.served.lock().serves_org(org)
    }

    /// Node orgs to negotiate with for `(org, name)`. A triplet with no node
    /// org contributes `org` itself.
    pub fn served_node_orgs_for(&self, org: &str, name: &str) -> Vec<String> {
        self.served.lock().node_orgs_for(org, name)
    }

    /// One line per org listing policy names and their service policy ids.
    pub fn short_summary(&self) -> String {
        let orgs = self.org_policies.lock();
        let mut out = String::from("Policy Manager:");
        for (org, policies) in orgs.iter() {
            out.push_str(&format!(" Org: {org}"));
            for (name, entry) in policies {
                out.push_str(&format!(" Business policy: {name} {}", entry.short_summary()));
            }
        }
        out
    }

    // -- Internals (org lock held) -------------------------------------------

    fn delete_org(&self, orgs: &mut OrgPolicyMap, org: &str) {
        if let Some(policies) = orgs.get(org) {
            for (name, entry) in policies {
                self.publish_deleted(org, name, entry);
            }
        }
        orgs.remove(org);
    }

    fn delete_business_policy(&self, orgs: &mut OrgPolicyMap, org: &str, name: &str) {
        let Some(policies) = orgs.get_mut(org) else {
            return;
        };
        if let Some(entry) = policies.get(name) {
            self.publish_deleted(org, name, entry);
            policies.remove(name);
        }
    }

    fn publish_deleted(&self, org: &str, name: &str, entry: &BusinessPolicyEntry) {
        tracing::info!(org = %org, policy = %name, "detected deleted business policy");
        match entry.policy().marshal() {
            Ok(serialized) => {
                self.publish(PolicyEvent::deleted(entry.policy().name(), org, serialized));
            }
            Err(e) => {
                tracing::error!(org = %org, policy = %name, error = %e, "unable to marshal deleted policy, no event published");
            }
        }
    }

    fn publish(&self, event: PolicyEvent) {
        if let Err(e) = self.events.publish(event) {
            tracing::error!(error = %e, "failed to publish policy event");
        }
    }
}

impl std::fmt::Display for PolicyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let orgs = self.org_policies.lock();
        f.write_str("Policy Manager:")?;
        for (org, policies) in orgs.iter() {
            write!(f, " Org: {org}")?;
            for (name, entry) in policies {
                write!(f, " Business policy: {name} {entry}")?;
            }
        }

        let served = self.served.lock();
        for (_, sp) in served.iter() {
            write!(f, " Serve: {sp}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for PolicyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyManager")
            .field("orgs", &self.all_tracked_orgs())
            .field("served", &self.served.lock().len())
            .finish()
    }
}
