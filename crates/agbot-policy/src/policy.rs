//! # Internal Policy Form
//!
//! The converted, matchable representation shared by business and service
//! policies. Negotiation workers consume it; the registry marshals it to JSON
//! as the payload of every change and delete event.

use serde::{Deserialize, Serialize};

use crate::business::{NodeHealth, WorkloadPriority};
use crate::error::PolicyError;
use crate::external::Property;

/// Version stamped into every generated policy header.
pub const POLICY_FORMAT_VERSION: &str = "2.0";

/// Agreement protocol offered by policies generated from business policies.
pub const BASIC_PROTOCOL: &str = "Basic";

/// Identifies a policy. For business policies `name` is the composite
/// `<org>/<name>` id; for service policies it is the service id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyHeader {
    /// Policy name.
    pub name: String,
    /// Format version.
    pub version: String,
}

impl PolicyHeader {
    /// Header for the current format version.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: POLICY_FORMAT_VERSION.to_string(),
        }
    }
}

/// An agreement protocol the policy is willing to negotiate with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementProtocol {
    /// Protocol name.
    pub name: String,
}

/// One deployable service version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    /// Service URL (its name in the fleet registry).
    pub workload_url: String,
    /// Org that owns the service.
    pub org: String,
    /// Exact service version.
    pub version: String,
    /// Hardware architecture; `*` matches any.
    pub arch: String,
    /// Rollback priority, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<WorkloadPriority>,
}

/// The internal, matchable policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Name and format version.
    pub header: PolicyHeader,
    /// Acceptable agreement protocols.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agreement_protocols: Vec<AgreementProtocol>,
    /// Deployable workloads, in preference order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workloads: Vec<Workload>,
    /// Advertised properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    /// Constraint expressions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
    /// Node health requirements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_health: Option<NodeHealth>,
}

impl Policy {
    /// Policy name from the header.
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Serialize to the JSON string carried in policy events.
    pub fn marshal(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a policy previously produced by [`Policy::marshal`].
    pub fn unmarshal(s: &str) -> Result<Self, PolicyError> {
        Ok(serde_json::from_str(s)?)
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Policy {} (v{}): {} workload(s), {} propert(ies), {} constraint(s)",
            self.header.name,
            self.header.version,
            self.workloads.len(),
            self.properties.len(),
            self.constraints.len()
        )
    }
}
