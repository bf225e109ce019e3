//! # Business Policies
//!
//! A business policy declares which service an org wants deployed, on which
//! versions, and under which properties and constraints. The fleet registry
//! wraps it in an [`ExchangeBusinessPolicy`] carrying bookkeeping timestamps;
//! only the inner [`BusinessPolicy`] is content, so only it is hashed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::external::{validate_constraints, validate_properties, Property};
use crate::policy::{AgreementProtocol, Policy, PolicyHeader, Workload, BASIC_PROTOCOL};

/// Architecture value that matches any node.
pub const ANY_ARCH: &str = "*";

/// Retry and rollback settings for one service version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadPriority {
    /// Lower values are preferred. Must be greater than zero.
    pub priority_value: u32,
    /// Retries before falling back to the next priority.
    #[serde(default)]
    pub retries: u32,
    /// Window, in seconds, over which retries are counted.
    #[serde(default)]
    pub retry_durations: u32,
    /// Seconds an agreement must run before it counts as verified.
    #[serde(default)]
    pub verified_durations: u32,
}

/// One acceptable version of the referenced service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadChoice {
    /// Exact version string.
    pub version: String,
    /// Optional rollback priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<WorkloadPriority>,
}

/// Heartbeat and agreement-status requirements for participating nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeHealth {
    /// Seconds without a heartbeat before the node is considered missing.
    #[serde(default)]
    pub missing_heartbeat_interval: u64,
    /// Seconds between agreement status checks.
    #[serde(default)]
    pub check_agreement_status: u64,
}

/// The service a business policy deploys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRef {
    /// Service URL.
    pub name: String,
    /// Org owning the service definition.
    #[serde(default)]
    pub org: String,
    /// Hardware architecture; empty or `*` means any.
    #[serde(default)]
    pub arch: String,
    /// Acceptable versions.
    #[serde(default)]
    pub service_versions: Vec<WorkloadChoice>,
    /// Node health requirements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_health: Option<NodeHealth>,
}

/// A business policy as defined in the fleet registry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessPolicy {
    /// Owning user.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,
    /// Short display label.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// The service to deploy.
    pub service: ServiceRef,
    /// Properties the deployment advertises.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    /// Constraints a node must satisfy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
}

impl BusinessPolicy {
    /// Semantic validation. Malformed policies never enter the cache.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let service = &self.service;
        if service.name.trim().is_empty() {
            return Err(PolicyError::MissingServiceName);
        }
        if service.org.trim().is_empty() {
            return Err(PolicyError::MissingServiceOrg {
                service: service.name.clone(),
            });
        }
        if service.service_versions.is_empty() {
            return Err(PolicyError::NoServiceVersions {
                service: service.name.clone(),
            });
        }

        let mut seen = BTreeSet::new();
        for choice in &service.service_versions {
            if !is_valid_version(&choice.version) {
                return Err(PolicyError::InvalidVersion {
                    version: choice.version.clone(),
                });
            }
            if !seen.insert(choice.version.as_str()) {
                return Err(PolicyError::DuplicateVersion {
                    version: choice.version.clone(),
                });
            }
            if matches!(choice.priority, Some(p) if p.priority_value == 0) {
                return Err(PolicyError::InvalidPriority {
                    version: choice.version.clone(),
                });
            }
        }

        validate_properties(&self.properties)?;
        validate_constraints(&self.constraints)
    }

    /// Validate and convert into the internal policy form.
    ///
    /// `policy_id` becomes the header name and is normally the composite
    /// `<org>/<name>` id the policy was served under.
    pub fn to_policy(&self, policy_id: &str) -> Result<Policy, PolicyError> {
        self.validate()?;
        if policy_id.is_empty() {
            return Err(PolicyError::MissingPolicyName);
        }

        let arch = match self.service.arch.trim() {
            "" => ANY_ARCH.to_string(),
            a => a.to_string(),
        };

        let mut choices: Vec<&WorkloadChoice> = self.service.service_versions.iter().collect();
        choices.sort_by(|a, b| {
            priority_rank(a)
                .cmp(&priority_rank(b))
                .then_with(|| a.version.cmp(&b.version))
        });

        let workloads = choices
            .into_iter()
            .map(|choice| Workload {
                workload_url: self.service.name.clone(),
                org: self.service.org.clone(),
                version: choice.version.clone(),
                arch: arch.clone(),
                priority: choice.priority,
            })
            .collect();

        Ok(Policy {
            header: PolicyHeader::new(policy_id),
            agreement_protocols: vec![AgreementProtocol {
                name: BASIC_PROTOCOL.to_string(),
            }],
            workloads,
            properties: self.properties.clone(),
            constraints: self.constraints.clone(),
            node_health: self.service.node_health,
        })
    }
}

/// A business policy record as returned by the fleet registry.
///
/// The timestamps change on every write in the registry, even when the
/// content does not, so they are excluded from hashing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeBusinessPolicy {
    /// The policy content.
    #[serde(flatten)]
    pub policy: BusinessPolicy,
    /// Creation time as reported by the registry.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created: String,
    /// Last write time as reported by the registry.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_updated: String,
}

impl ExchangeBusinessPolicy {
    /// Wrap content with empty bookkeeping fields.
    pub fn new(policy: BusinessPolicy) -> Self {
        Self {
            policy,
            created: String::new(),
            last_updated: String::new(),
        }
    }

    /// The hashable content.
    pub fn business_policy(&self) -> &BusinessPolicy {
        &self.policy
    }
}

impl From<BusinessPolicy> for ExchangeBusinessPolicy {
    fn from(policy: BusinessPolicy) -> Self {
        Self::new(policy)
    }
}

fn priority_rank(choice: &WorkloadChoice) -> u32 {
    choice.priority.map_or(u32::MAX, |p| p.priority_value)
}

/// One to three dot-separated unsigned integers, e.g. `1`, `1.2`, `1.2.3`.
fn is_valid_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    (1..=3).contains(&parts.len())
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn netspeed() -> BusinessPolicy {
        BusinessPolicy {
            owner: "e2edev/e2edevadmin".to_string(),
            label: "netspeed".to_string(),
            description: String::new(),
            service: ServiceRef {
                name: "https://bluehorizon.network/services/netspeed".to_string(),
                org: "e2edev".to_string(),
                arch: String::new(),
                service_versions: vec![
                    WorkloadChoice {
                        version: "2.3.0".to_string(),
                        priority: Some(WorkloadPriority {
                            priority_value: 3,
                            retries: 1,
                            retry_durations: 1800,
                            verified_durations: 45,
                        }),
                    },
                    WorkloadChoice {
                        version: "2.3.1".to_string(),
                        priority: Some(WorkloadPriority {
                            priority_value: 2,
                            retries: 1,
                            retry_durations: 3600,
                            verified_durations: 52,
                        }),
                    },
                ],
                node_health: Some(NodeHealth {
                    missing_heartbeat_interval: 1800,
                    check_agreement_status: 1800,
                }),
            },
            properties: vec![Property::new("iame2edev", "true")],
            constraints: vec!["purpose == network-testing".to_string()],
        }
    }

    #[test]
    fn valid_policy_passes() {
        assert!(netspeed().validate().is_ok());
    }

    #[test]
    fn conversion_orders_workloads_by_priority() {
        let policy = netspeed().to_policy("e2edev/bp_netspeed").unwrap();
        assert_eq!(policy.header.name, "e2edev/bp_netspeed");
        let versions: Vec<&str> = policy.workloads.iter().map(|w| w.version.as_str()).collect();
        assert_eq!(versions, vec!["2.3.1", "2.3.0"]);
        assert!(policy.workloads.iter().all(|w| w.arch == ANY_ARCH));
        assert_eq!(policy.agreement_protocols[0].name, BASIC_PROTOCOL);
        assert_eq!(policy.node_health.unwrap().missing_heartbeat_interval, 1800);
    }

    #[test]
    fn unprioritized_versions_sort_last() {
        let mut bp = netspeed();
        bp.service.service_versions.insert(
            0,
            WorkloadChoice {
                version: "1.0.0".to_string(),
                priority: None,
            },
        );
        let policy = bp.to_policy("e2edev/bp_netspeed").unwrap();
        assert_eq!(policy.workloads.last().unwrap().version, "1.0.0");
    }

    #[test]
    fn explicit_arch_is_kept() {
        let mut bp = netspeed();
        bp.service.arch = "arm64".to_string();
        let policy = bp.to_policy("e2edev/bp_netspeed").unwrap();
        assert!(policy.workloads.iter().all(|w| w.arch == "arm64"));
    }

    #[test]
    fn missing_service_name_rejected() {
        let mut bp = netspeed();
        bp.service.name = String::new();
        assert!(matches!(bp.validate(), Err(PolicyError::MissingServiceName)));
    }

    #[test]
    fn missing_service_org_rejected() {
        let mut bp = netspeed();
        bp.service.org = " ".to_string();
        assert!(matches!(
            bp.validate(),
            Err(PolicyError::MissingServiceOrg { .. })
        ));
    }

    #[test]
    fn no_versions_rejected() {
        let mut bp = netspeed();
        bp.service.service_versions.clear();
        assert!(matches!(
            bp.validate(),
            Err(PolicyError::NoServiceVersions { .. })
        ));
    }

    #[test]
    fn bad_version_strings_rejected() {
        for bad in ["", "1.", "1.2.3.4", "v1.0", "1.x"] {
            let mut bp = netspeed();
            bp.service.service_versions[0].version = bad.to_string();
            assert!(
                matches!(bp.validate(), Err(PolicyError::InvalidVersion { .. })),
                "version {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn duplicate_version_rejected() {
        let mut bp = netspeed();
        bp.service.service_versions[1].version = "2.3.0".to_string();
        assert!(matches!(
            bp.validate(),
            Err(PolicyError::DuplicateVersion { .. })
        ));
    }

    #[test]
    fn zero_priority_rejected() {
        let mut bp = netspeed();
        if let Some(p) = bp.service.service_versions[0].priority.as_mut() {
            p.priority_value = 0;
        }
        assert!(matches!(
            bp.validate(),
            Err(PolicyError::InvalidPriority { .. })
        ));
    }

    #[test]
    fn empty_policy_id_rejected() {
        assert!(matches!(
            netspeed().to_policy(""),
            Err(PolicyError::MissingPolicyName)
        ));
    }

    #[test]
    fn exchange_record_parses_registry_json() {
        let raw = r#"{
            "owner": "userdev/userdevadmin",
            "label": "gpstest",
            "service": {
                "name": "https://bluehorizon.network/services/gpstest",
                "org": "userdev",
                "arch": "amd64",
                "serviceVersions": [{"version": "1.0.0"}]
            },
            "properties": [{"name": "purpose", "value": "location"}],
            "constraints": ["location == true"],
            "created": "2026-01-15T12:00:00Z",
            "lastUpdated": "2026-01-16T08:30:00Z"
        }"#;
        let record: ExchangeBusinessPolicy = serde_json::from_str(raw).unwrap();
        assert_eq!(record.last_updated, "2026-01-16T08:30:00Z");
        assert_eq!(record.business_policy().service.arch, "amd64");
        assert!(record.business_policy().validate().is_ok());
    }
}
